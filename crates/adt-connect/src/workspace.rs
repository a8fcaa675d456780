//! Workspace folders of the host
//!
//! Every connected system is mounted as a folder `adt://<SYSTEM-ID>`.
//! Folders are only ever appended: inserting anywhere else makes some
//! hosts reload the whole workspace.

use std::path::{Path, PathBuf};

use adt_core::{AdtUri, ConnectionError, SystemId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub uri: String,
    pub name: String,
}

impl WorkspaceFolder {
    pub fn for_system(system_id: &SystemId) -> Self {
        Self {
            uri: adt_core::connection_uri(system_id),
            name: system_id.to_string(),
        }
    }

    /// The system this folder mounts, if it is an `adt://` folder
    pub fn system_id(&self) -> Option<SystemId> {
        AdtUri::parse(&self.uri).ok().map(|uri| uri.system_id)
    }
}

#[async_trait]
pub trait Workspace: Send + Sync {
    async fn folders(&self) -> Vec<WorkspaceFolder>;

    /// Append a folder after all existing ones
    async fn append_folder(&self, folder: WorkspaceFolder) -> Result<(), ConnectionError>;
}

#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    folders: RwLock<Vec<WorkspaceFolder>>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folders(folders: Vec<WorkspaceFolder>) -> Self {
        Self {
            folders: RwLock::new(folders),
        }
    }
}

#[async_trait]
impl Workspace for MemoryWorkspace {
    async fn folders(&self) -> Vec<WorkspaceFolder> {
        self.folders.read().await.clone()
    }

    async fn append_folder(&self, folder: WorkspaceFolder) -> Result<(), ConnectionError> {
        self.folders.write().await.push(folder);
        Ok(())
    }
}

/// Folders kept in a JSON file, for hosts without a workspace of their own
#[derive(Debug)]
pub struct FileWorkspace {
    path: PathBuf,
    folders: RwLock<Vec<WorkspaceFolder>>,
}

impl FileWorkspace {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConnectionError> {
        let path = path.into();
        let folders = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ConnectionError::Workspace(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ConnectionError::Workspace(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            path,
            folders: RwLock::new(folders),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, folders: &[WorkspaceFolder]) -> Result<(), ConnectionError> {
        let fail = |e: String| ConnectionError::Workspace(format!("{}: {}", self.path.display(), e));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(folders).map_err(|e| fail(e.to_string()))?;
        std::fs::write(&self.path, bytes).map_err(|e| fail(e.to_string()))
    }
}

#[async_trait]
impl Workspace for FileWorkspace {
    async fn folders(&self) -> Vec<WorkspaceFolder> {
        self.folders.read().await.clone()
    }

    async fn append_folder(&self, folder: WorkspaceFolder) -> Result<(), ConnectionError> {
        let mut folders = self.folders.write().await;
        folders.push(folder);
        if let Err(e) = self.save(&folders) {
            folders.pop();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_folder_for_system() {
        let folder = WorkspaceFolder::for_system(&SystemId::new("a4h"));
        assert_eq!(folder.uri, "adt://A4H");
        assert_eq!(folder.name, "A4H");
        assert_eq!(folder.system_id(), Some(SystemId::new("A4H")));

        let local = WorkspaceFolder {
            uri: "file:///home/dev/project".into(),
            name: "project".into(),
        };
        assert_eq!(local.system_id(), None);
    }

    #[tokio::test]
    async fn test_file_workspace_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.json");

        let workspace = FileWorkspace::load(&path).unwrap();
        assert!(workspace.folders().await.is_empty());
        workspace
            .append_folder(WorkspaceFolder::for_system(&SystemId::new("NPL")))
            .await
            .unwrap();

        let reloaded = FileWorkspace::load(&path).unwrap();
        assert_eq!(
            reloaded.folders().await,
            vec![WorkspaceFolder::for_system(&SystemId::new("NPL"))]
        );
    }
}
