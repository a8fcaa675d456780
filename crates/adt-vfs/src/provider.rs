//! Where tree contents come from

use async_trait::async_trait;

use adt_connect::ConnectionManager;
use adt_core::SystemId;
use adt_protocol::{
    Expand, ExpandParams, FilesystemNode, NodeId, ReadSource, ReadSourceParams,
};

use crate::error::VfsError;

/// Source of children and file contents
///
/// `Ok(None)` means the system has no live connection, which the
/// filesystem treats differently from a failed request. A connection the
/// server hung up on counts as none, even before the manager evicted it.
#[async_trait]
pub trait NodeProvider: Send + Sync {
    async fn expand(
        &self,
        system_id: &SystemId,
        id: NodeId,
    ) -> Result<Option<Vec<FilesystemNode>>, VfsError>;

    async fn source(
        &self,
        system_id: &SystemId,
        id: NodeId,
        uri: &str,
    ) -> Result<Option<String>, VfsError>;
}

#[async_trait]
impl NodeProvider for ConnectionManager {
    async fn expand(
        &self,
        system_id: &SystemId,
        id: NodeId,
    ) -> Result<Option<Vec<FilesystemNode>>, VfsError> {
        let Some(connection) = self.get_active(system_id).filter(|c| c.is_connected()) else {
            return Ok(None);
        };

        let result = match connection.invoke::<Expand>(ExpandParams { id }).await {
            Ok(result) => result,
            // Hung up while the request was out
            Err(_) if !connection.is_connected() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Node ids belong to the session that issued them.
        if !self.is_current(&connection) {
            tracing::debug!("Dropping expansion of {} on {}: connection replaced", id, system_id);
            return Ok(None);
        }
        Ok(Some(result.children))
    }

    async fn source(
        &self,
        system_id: &SystemId,
        id: NodeId,
        uri: &str,
    ) -> Result<Option<String>, VfsError> {
        let Some(connection) = self.get_active(system_id).filter(|c| c.is_connected()) else {
            return Ok(None);
        };

        let params = ReadSourceParams {
            id,
            uri: uri.to_string(),
        };
        let result = match connection.invoke::<ReadSource>(params).await {
            Ok(result) => result,
            Err(_) if !connection.is_connected() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !self.is_current(&connection) {
            return Ok(None);
        }
        Ok(Some(result.content))
    }
}
