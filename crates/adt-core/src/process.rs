//! Handle on the local language server process
//!
//! Whether the server process exists and whether its socket accepts
//! connections are separate questions. Restoring parked connections asks
//! the first one, so that it never launches a server on its own.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::TransportError;

/// Environment variable overriding the server executable
pub const SERVER_OVERRIDE_ENV: &str = "ADT_SERVER_DEBUG";

#[async_trait]
pub trait BackendProcess: Send + Sync {
    /// Path of the server executable
    fn executable(&self) -> &Path;

    /// Whether a process running the server executable exists
    async fn is_running(&self) -> bool;

    /// Launch the server detached from this process
    ///
    /// The child gets no stdio, its own process group, and is never waited
    /// on. It keeps running after the host exits.
    fn spawn_detached(&self) -> Result<(), TransportError>;
}

/// The language server on this machine
#[derive(Debug, Clone)]
pub struct LocalBackend {
    executable: PathBuf,
}

impl LocalBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Use `ADT_SERVER_DEBUG` when set, else the configured executable
    pub fn from_env_or(configured: impl Into<PathBuf>) -> Self {
        match std::env::var_os(SERVER_OVERRIDE_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::new(configured),
        }
    }

    fn file_name(&self) -> Option<&OsStr> {
        self.executable.file_name()
    }
}

#[async_trait]
impl BackendProcess for LocalBackend {
    fn executable(&self) -> &Path {
        &self.executable
    }

    async fn is_running(&self) -> bool {
        let Some(wanted) = self.file_name().map(OsStr::to_os_string) else {
            return false;
        };

        // Scanning the process table blocks for a noticeable moment.
        tokio::task::spawn_blocking(move || process_exists(&wanted))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Process scan failed: {}", e);
                false
            })
    }

    fn spawn_detached(&self) -> Result<(), TransportError> {
        let mut command = tokio::process::Command::new(&self.executable);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(unix)]
        command.process_group(0);

        #[cfg(windows)]
        {
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let child = command.spawn().map_err(|source| TransportError::Spawn {
            path: self.executable.clone(),
            source,
        })?;

        tracing::info!(
            "Started language server {:?} (pid {:?})",
            self.executable,
            child.id()
        );

        // Dropping the handle leaves reaping to the runtime.
        drop(child);
        Ok(())
    }
}

fn process_exists(file_name: &OsStr) -> bool {
    let system = sysinfo::System::new_all();
    system.processes().values().any(|process| {
        let name: &OsStr = process.name().as_ref();
        name == file_name
            || process
                .exe()
                .and_then(Path::file_name)
                .is_some_and(|exe| exe == file_name)
    })
}
