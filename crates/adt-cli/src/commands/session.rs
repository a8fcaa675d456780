//! Connecting, disconnecting and restoring

use anyhow::{Context, Result};

use adt_connect::RestoreReport;
use adt_protocol::ConnectResult;

use crate::host::{join_ids, Host};
use crate::output::{print_info, print_success};

pub async fn connect_command(host: &Host, name: &str) -> Result<()> {
    let data = host.find(name).await?;
    let connection = host
        .manager()
        .connect(&data)
        .await
        .with_context(|| format!("Failed to connect '{}'", name))?;

    let how = match connection.outcome() {
        ConnectResult::Created => "new session",
        ConnectResult::Restored => "restored session",
        ConnectResult::AlreadyConnected => "existing session",
    };
    print_success(&format!(
        "Connected to {} at {} ({}), browse it under {}",
        data.system_id,
        data.params.endpoint(),
        how,
        data.uri()
    ));
    Ok(())
}

pub async fn disconnect_command(host: &Host, name: &str) -> Result<()> {
    let data = host.find(name).await?;
    host.manager()
        .disconnect(&data)
        .await
        .with_context(|| format!("Failed to disconnect '{}'", name))?;
    print_success(&format!("Disconnected from {}", data.system_id));
    Ok(())
}

/// Report on the restore every session starts with
pub fn restore_command(host: &Host, report: &RestoreReport) -> Result<()> {
    if matches!(report, RestoreReport::NothingParked) {
        print_info("No parked connections");
    }
    let active = host.manager().active_ids();
    if active.is_empty() {
        print_info("No active connections");
    } else {
        print_success(&format!("Active: {}", join_ids(&active)));
    }
    Ok(())
}
