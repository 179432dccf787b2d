// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative helpers shared by the Kiln crates.

/// `Display` for status-like enums, one literal per variant. Variants with
/// data take `(..)`.
///
/// ```ignore
/// crate::simple_display! {
///     BuildStatus {
///         Queued => "queued",
///         Failed => "failed",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Builder-style setters for option structs, generated inside an `impl`.
///
/// `set { field: Type }` takes the value as is. `option { field: Type }`
/// fills an `Option<Type>` field from anything `Into<Type>`, which is how
/// the executor's `CommandOptions` takes its timeout and working directory.
///
/// ```ignore
/// impl StepOptions {
///     kiln_core::setters! {
///         set { args: Vec<String> }
///         option { timeout_ms: i64 }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(set {
            $( $set_field:ident : $set_ty:ty ),* $(,)?
        })?
        $(option {
            $( $opt_field:ident : $opt_ty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $set_field(mut self, v: $set_ty) -> Self {
                self.$set_field = v;
                self
            }
        )*)?

        $($(
            pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                self.$opt_field = Some(v.into());
                self
            }
        )*)?
    };
}
