//! The connection manager as this process sees it
//!
//! A CLI run is a short host session: parked connections are restored when
//! it starts and parked again when it ends, so the language server keeps the
//! logon sessions alive between commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use adt_connect::{ConnectionManager, EnvCredentials, FileWorkspace, RestoreReport, SocketEstablisher};
use adt_core::config::ClientConfig;
use adt_core::store::{FileStore, StateStore};
use adt_core::{ConnectionData, SystemId};

use crate::output::{print_info, print_warning};

const WORKSPACE_FILE: &str = "workspace.json";

pub struct Host {
    store: Arc<FileStore>,
    manager: Arc<ConnectionManager>,
}

impl Host {
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let store = Arc::new(FileStore::new(&config.state_dir));
        let workspace = FileWorkspace::load(config.state_dir.join(WORKSPACE_FILE))
            .context("Failed to load workspace folders")?;
        let manager = ConnectionManager::new(
            SocketEstablisher::from_config(config),
            store.clone(),
            Arc::new(workspace),
            Arc::new(EnvCredentials),
        )
        .with_context(|| format!("Failed to load connections from {:?}", config.state_dir))?
        .with_test_timeout(config.test_timeout);

        Ok(Self {
            store,
            manager: Arc::new(manager),
        })
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Systems parked by the previous run
    pub fn parked(&self) -> Result<Vec<SystemId>> {
        self.store
            .load_parked()
            .context("Failed to read parked connections")
    }

    pub async fn find(&self, name: &str) -> Result<ConnectionData> {
        self.manager
            .get_by_name(name)
            .await
            .with_context(|| format!("No connection named '{}'", name))
    }

    /// Reattach to the previous run's sessions and report what happened
    pub async fn restore(&self, quiet: bool) -> Result<RestoreReport> {
        let report = self
            .manager
            .restore_workspace_connections()
            .await
            .context("Failed to restore parked connections")?;

        if !quiet {
            match &report {
                RestoreReport::NothingParked => {}
                RestoreReport::ServerNotRunning { parked } => print_warning(&format!(
                    "Language server is not running, {} session(s) lost",
                    parked.len()
                )),
                RestoreReport::Completed { restored, failed } => {
                    if !restored.is_empty() {
                        print_info(&format!("Restored {}", join_ids(restored)));
                    }
                    if !failed.is_empty() {
                        print_warning(&format!("Sessions expired: {}", join_ids(failed)));
                    }
                }
            }
        }
        Ok(report)
    }

    /// Park every active connection for the next run
    pub async fn park(&self) -> Result<Vec<SystemId>> {
        self.manager
            .park()
            .await
            .context("Failed to park connections")
    }
}

pub fn join_ids(ids: &[SystemId]) -> String {
    ids.iter()
        .map(SystemId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
