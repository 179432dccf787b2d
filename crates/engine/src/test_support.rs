// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for engine tests.

use kiln_core::{LogLine, StepEvent, WorkflowEvent};
use parking_lot::Mutex;

use crate::observer::{MessageLog, StepObserver, WorkflowObserver};

/// Records every callback it receives.
#[derive(Default)]
pub(crate) struct RecordingLogger {
    pub lines: Mutex<Vec<LogLine>>,
    pub steps: Mutex<Vec<StepEvent>>,
    pub workflows: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().iter().map(|l| l.message.clone()).collect()
    }

    pub fn step_events(&self) -> Vec<StepEvent> {
        self.steps.lock().clone()
    }
}

impl MessageLog for RecordingLogger {
    fn message(&self, line: &LogLine) {
        self.lines.lock().push(line.clone());
    }
}

impl StepObserver for RecordingLogger {
    fn on_step(&self, event: &StepEvent) {
        self.steps.lock().push(event.clone());
    }
}

impl WorkflowObserver for RecordingLogger {
    fn on_workflow(&self, event: &WorkflowEvent) {
        self.workflows.lock().push(event.clone());
    }
}
