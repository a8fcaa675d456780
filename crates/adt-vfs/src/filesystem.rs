//! The `adt://` filesystem
//!
//! Each system root is guarded by its own lock, held across the fetch of
//! a missing directory. Two lookups on the same system therefore never
//! fetch the same directory twice, while different systems proceed
//! independently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use adt_connect::{ConnectionEvent, ConnectionEventKind, ConnectionManager};
use adt_core::{AdtUri, SystemId};

use crate::error::VfsError;
use crate::provider::NodeProvider;
use crate::tree::TreeNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    /// File name, the system id for a root
    pub name: String,
}

pub struct VirtualFilesystem {
    provider: Arc<dyn NodeProvider>,
    roots: DashMap<SystemId, Arc<Mutex<TreeNode>>>,
}

impl VirtualFilesystem {
    pub fn new(provider: Arc<dyn NodeProvider>) -> Self {
        Self {
            provider,
            roots: DashMap::new(),
        }
    }

    /// Filesystem backed by `manager`, with its roots kept in step with
    /// the manager's events
    ///
    /// The filesystem keeps the manager alive, so the tracking task runs
    /// until the returned handle is aborted.
    pub async fn attach(manager: Arc<ConnectionManager>) -> (Arc<Self>, JoinHandle<()>) {
        // Subscribe before seeding so nothing slips through in between.
        let events = manager.subscribe();
        let vfs = Arc::new(Self::new(manager.clone()));
        for data in manager.workspace_connections().await {
            vfs.add_root(&data.system_id);
        }
        let tracker = tokio::spawn(Arc::clone(&vfs).track(manager, events));
        (vfs, tracker)
    }

    async fn track(
        self: Arc<Self>,
        manager: Arc<ConnectionManager>,
        mut events: broadcast::Receiver<ConnectionEvent>,
    ) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Filesystem missed {} connection events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let system_id = &event.connection.system_id;
            match event.kind {
                // A new session hands out new node ids
                ConnectionEventKind::Connected => {
                    self.roots.insert(system_id.clone(), fresh_root(system_id));
                }
                ConnectionEventKind::Disconnected => self.reset_root(system_id),
                ConnectionEventKind::Deleted => self.remove_root(system_id),
                // Redeclared, e.g. by an update, while its folder is still there
                ConnectionEventKind::Added => {
                    let mounted = manager
                        .workspace_connections()
                        .await
                        .iter()
                        .any(|c| c.system_id == *system_id);
                    if mounted {
                        self.add_root(system_id);
                    }
                }
            }
        }
        tracing::debug!("Connection events closed, filesystem tracking stopped");
    }

    // ---- roots ----

    /// Mount a system; no-op when it is already mounted
    pub fn add_root(&self, system_id: &SystemId) {
        self.roots
            .entry(system_id.clone())
            .or_insert_with(|| fresh_root(system_id));
    }

    /// Throw away everything cached below a root
    ///
    /// Lookups already running finish against the discarded tree.
    pub fn reset_root(&self, system_id: &SystemId) {
        if let Some(mut root) = self.roots.get_mut(system_id) {
            *root = fresh_root(system_id);
            tracing::debug!("Reset tree of {}", system_id);
        }
    }

    pub fn remove_root(&self, system_id: &SystemId) {
        if self.roots.remove(system_id).is_some() {
            tracing::debug!("Unmounted {}", system_id);
        }
    }

    /// Mounted systems, sorted
    pub fn roots(&self) -> Vec<SystemId> {
        let mut ids: Vec<SystemId> = self.roots.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn root(&self, system_id: &SystemId) -> Option<Arc<Mutex<TreeNode>>> {
        self.roots.get(system_id).map(|r| Arc::clone(r.value()))
    }

    // ---- reading ----

    pub async fn stat(&self, uri: &str) -> Result<FileStat, VfsError> {
        let parsed = AdtUri::parse(uri)?;
        let root = self
            .root(&parsed.system_id)
            .ok_or_else(|| VfsError::FileNotFound(uri.to_string()))?;
        let mut root = root.lock().await;
        let node = self.resolve(uri, &parsed, &mut root).await?;
        Ok(FileStat {
            file_type: node.file_type(),
            name: node.display_name().to_string(),
        })
    }

    /// `(file name, type)` of each entry in a directory
    ///
    /// A directory is fetched the first time it is listed. A mounted system
    /// without an active connection lists as empty and nothing is cached.
    pub async fn read_directory(&self, uri: &str) -> Result<Vec<(String, FileType)>, VfsError> {
        let parsed = AdtUri::parse(uri)?;
        let root = self
            .root(&parsed.system_id)
            .ok_or_else(|| VfsError::FileNotFound(uri.to_string()))?;
        let mut root = root.lock().await;
        let node = self.resolve(uri, &parsed, &mut root).await?;
        if !node.is_expandable() {
            return Err(VfsError::FileNotADirectory(uri.to_string()));
        }
        if !self.fetch_children(&parsed.system_id, node).await? {
            return Ok(Vec::new());
        }
        Ok(node.listing())
    }

    /// Source code of an object; never cached
    pub async fn read_file(&self, uri: &str) -> Result<Vec<u8>, VfsError> {
        let parsed = AdtUri::parse(uri)?;
        let root = self
            .root(&parsed.system_id)
            .ok_or_else(|| VfsError::FileNotFound(uri.to_string()))?;
        let id = {
            let mut root = root.lock().await;
            let node = self.resolve(uri, &parsed, &mut root).await?;
            if node.is_expandable() {
                return Err(VfsError::FileIsADirectory(uri.to_string()));
            }
            node.id()
        };

        match self.provider.source(&parsed.system_id, id, uri).await? {
            Some(content) => Ok(content.into_bytes()),
            None => Err(VfsError::Unavailable(parsed.system_id)),
        }
    }

    // ---- writing: the filesystem is read-only ----

    pub async fn write_file(&self, uri: &str, _content: &[u8]) -> Result<(), VfsError> {
        Err(VfsError::FileNotFound(uri.to_string()))
    }

    pub async fn create_directory(&self, uri: &str) -> Result<(), VfsError> {
        Err(VfsError::FileNotFound(uri.to_string()))
    }

    pub async fn delete(&self, uri: &str) -> Result<(), VfsError> {
        Err(VfsError::FileNotFound(uri.to_string()))
    }

    pub async fn rename(&self, from: &str, _to: &str) -> Result<(), VfsError> {
        Err(VfsError::FileNotFound(from.to_string()))
    }

    // ---- tree walking ----

    /// Walk down to the node a URI names, fetching directories on the way
    async fn resolve<'a>(
        &self,
        uri: &str,
        parsed: &AdtUri,
        root: &'a mut TreeNode,
    ) -> Result<&'a mut TreeNode, VfsError> {
        let mut node = root;
        for segment in &parsed.segments {
            if !node.is_expandable() || !self.fetch_children(&parsed.system_id, node).await? {
                return Err(VfsError::FileNotFound(uri.to_string()));
            }
            node = node
                .child_mut(segment)
                .ok_or_else(|| VfsError::FileNotFound(uri.to_string()))?;
        }
        Ok(node)
    }

    /// Make sure the children of `node` are known
    ///
    /// Returns `false` when they are not and cannot be fetched because the
    /// system has no active connection.
    async fn fetch_children(
        &self,
        system_id: &SystemId,
        node: &mut TreeNode,
    ) -> Result<bool, VfsError> {
        if node.is_fetched() {
            return Ok(true);
        }
        match self.provider.expand(system_id, node.id()).await? {
            Some(children) => {
                tracing::debug!(
                    "Fetched {} children of {} on {}",
                    children.len(),
                    node.id(),
                    system_id
                );
                node.set_children(children);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn fresh_root(system_id: &SystemId) -> Arc<Mutex<TreeNode>> {
    Arc::new(Mutex::new(TreeNode::system_root(system_id)))
}
