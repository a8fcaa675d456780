//! Reading the `adt://` filesystem

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use adt_core::AdtUri;
use adt_vfs::VirtualFilesystem;

use crate::host::Host;
use crate::output::{format_listing, format_stat, print_warning};

/// Warn when the system behind `uri` has no active connection
fn check_connected(host: &Host, uri: &str) {
    let Ok(parsed) = AdtUri::parse(uri) else {
        return;
    };
    if host.manager().get_active(&parsed.system_id).is_none() {
        print_warning(&format!(
            "{} is not connected, its contents cannot be fetched",
            parsed.system_id
        ));
    }
}

async fn mount(host: &Host) -> (Arc<VirtualFilesystem>, tokio::task::JoinHandle<()>) {
    VirtualFilesystem::attach(Arc::clone(host.manager())).await
}

pub async fn ls_command(host: &Host, uri: &str) -> Result<()> {
    check_connected(host, uri);
    let (vfs, tracker) = mount(host).await;
    let entries = vfs.read_directory(uri).await;
    tracker.abort();

    let entries = entries.with_context(|| format!("Cannot list {}", uri))?;
    if !entries.is_empty() {
        println!("{}", format_listing(&entries));
    }
    Ok(())
}

pub async fn cat_command(host: &Host, uri: &str) -> Result<()> {
    let (vfs, tracker) = mount(host).await;
    let content = vfs.read_file(uri).await;
    tracker.abort();

    let content = content.with_context(|| format!("Cannot read {}", uri))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    if !content.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

pub async fn stat_command(host: &Host, uri: &str) -> Result<()> {
    let (vfs, tracker) = mount(host).await;
    let stat = vfs.stat(uri).await;
    tracker.abort();

    let stat = stat.with_context(|| format!("Cannot stat {}", uri))?;
    println!("{}", format_stat(uri, &stat));
    Ok(())
}
