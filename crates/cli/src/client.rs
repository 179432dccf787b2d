// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client over the Unix socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_core::{Build, BuildId, BuildStatus, LogEntry};
use kiln_wire::{self as wire, BuildSummary, ProtocolError, Request, Response, SweepSummary};
use thiserror::Error;
use tokio::net::UnixStream;

/// Idle limit between frames of a follow stream.
const FOLLOW_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("daemon not running (no socket at {})", .0.display())]
    DaemonNotRunning(PathBuf),

    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response from daemon: {0}")]
    UnexpectedResponse(String),

    #[error("log stream ended before the build finished")]
    StreamEnded,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::DaemonNotRunning(_))
    }
}

/// Log catch-up result from `GetLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
    pub status: BuildStatus,
    pub is_complete: bool,
}

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    /// Client for the daemon serving this user's state directory.
    pub fn connect() -> Result<Self, ClientError> {
        let state_dir = kiln_daemon::env::state_dir().map_err(|_| ClientError::NoStateDir)?;
        let config = kiln_daemon::Config::at(state_dir);
        Ok(Self::at(config.socket_path))
    }

    pub fn at(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), timeout: kiln_daemon::env::ipc_timeout() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn open(&self) -> Result<UnixStream, ClientError> {
        UnixStream::connect(&self.socket_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                ClientError::DaemonNotRunning(self.socket_path.clone())
            }
            _ => ClientError::Protocol(ProtocolError::Io(e)),
        })
    }

    /// One request, one response.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = self.open().await?;
        wire::write_request(&mut stream, request, self.timeout).await?;
        Ok(wire::read_response(&mut stream, self.timeout).await?)
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn trigger(
        &self,
        plan: PathBuf,
        profiles: Vec<String>,
        source: impl Into<String>,
    ) -> Result<BuildId, ClientError> {
        let request = Request::Trigger { plan, profiles, source: source.into() };
        match self.send(&request).await? {
            Response::Triggered { id } => Ok(id),
            other => Self::reject(other),
        }
    }

    pub async fn cancel(&self, id: &str) -> Result<(BuildId, BuildStatus), ClientError> {
        match self.send(&Request::Cancel { id: id.to_string() }).await? {
            Response::Cancelled { id, status } => Ok((id, status)),
            other => Self::reject(other),
        }
    }

    /// Returns the new build's id and the id it was retried from.
    pub async fn retry(&self, id: &str) -> Result<(BuildId, BuildId), ClientError> {
        match self.send(&Request::Retry { id: id.to_string() }).await? {
            Response::Retried { id, retry_of } => Ok((id, retry_of)),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self, id: &str) -> Result<Build, ClientError> {
        match self.send(&Request::Status { id: id.to_string() }).await? {
            Response::Build { build } => Ok(*build),
            other => Self::reject(other),
        }
    }

    pub async fn list(&self) -> Result<Vec<BuildSummary>, ClientError> {
        match self.send(&Request::List).await? {
            Response::Builds { builds } => Ok(builds),
            other => Self::reject(other),
        }
    }

    /// Every entry after `after`, fetched page by page until the daemon has
    /// nothing more to send.
    pub async fn logs(&self, id: &str, mut after: u64) -> Result<LogPage, ClientError> {
        let mut page = LogPage { entries: Vec::new(), status: BuildStatus::Queued, is_complete: false };
        loop {
            let (entries, status, is_complete) =
                match self.send(&Request::GetLogs { id: id.to_string(), after }).await? {
                    Response::Logs { entries, status, is_complete } => (entries, status, is_complete),
                    other => return Self::reject(other),
                };
            page.status = status;
            page.is_complete = is_complete;
            let Some(last) = entries.last().map(|e| e.sequence) else { return Ok(page) };
            after = last;
            page.entries.extend(entries);
            if is_complete {
                return Ok(page);
            }
        }
    }

    pub async fn sweep(&self) -> Result<SweepSummary, ClientError> {
        match self.send(&Request::Sweep).await? {
            Response::Swept { report } => Ok(report),
            other => Self::reject(other),
        }
    }

    /// Stream a build's log to `on_entry` until the build finishes.
    ///
    /// Entries at or below the last delivered sequence are dropped, so each
    /// sequence reaches `on_entry` at most once and in order.
    pub async fn follow(
        &self,
        id: &str,
        after: u64,
        mut on_entry: impl FnMut(&LogEntry),
    ) -> Result<BuildStatus, ClientError> {
        let mut stream = self.open().await?;
        let request = Request::Follow { id: id.to_string(), after };
        wire::write_request(&mut stream, &request, self.timeout).await?;

        let mut last = after;
        let mut deliver = |entry: &LogEntry| {
            if entry.sequence > last {
                last = entry.sequence;
                on_entry(entry);
            }
        };

        match wire::read_response(&mut stream, self.timeout).await? {
            Response::Logs { entries, .. } => entries.iter().for_each(&mut deliver),
            other => return Self::reject(other),
        }

        loop {
            let response = match wire::read_response(&mut stream, FOLLOW_IDLE_TIMEOUT).await {
                Ok(response) => response,
                Err(ProtocolError::ConnectionClosed) => return Err(ClientError::StreamEnded),
                Err(e) => return Err(e.into()),
            };
            match response {
                Response::Entry { entry } => deliver(&entry),
                Response::Done { status } => return Ok(status),
                other => return Self::reject(other),
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
