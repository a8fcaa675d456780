//! Filesystem over a live connection manager
//!
//! Reuses the in-process language server of the connection tests.

#[path = "../../adt-connect/tests/common/mod.rs"]
mod common;

use std::future::Future;
use std::time::Duration;

use adt_connect::{MemoryWorkspace, WorkspaceFolder};
use adt_core::SystemId;
use adt_protocol::{FilesystemNode, GroupKind, NodeId, ObjectKind};
use adt_vfs::{FileType, VfsError, VirtualFilesystem};

use common::{http_connection, Harness};

fn sid(id: &str) -> SystemId {
    SystemId::new(id)
}

/// Poll until `check` holds; event delivery to the filesystem is async
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held");
}

fn seed_tree(h: &Harness) {
    h.server.set_children(
        NodeId::SYSTEM_ROOT,
        vec![FilesystemNode::Group {
            id: NodeId::new(2, 1),
            name: "Local Objects".into(),
            group: GroupKind::LocalObjects,
        }],
    );
    h.server.set_children(
        NodeId::new(2, 1),
        vec![
            FilesystemNode::RepositoryObject {
                id: NodeId::new(3, 1),
                name: "/DMO/CL_FLIGHT".into(),
                object_kind: ObjectKind::Class,
            },
            FilesystemNode::RepositoryObject {
                id: NodeId::new(4, 1),
                name: "ZDEMO".into(),
                object_kind: ObjectKind::Package,
            },
        ],
    );
    h.server
        .set_source(NodeId::new(3, 1), "CLASS /dmo/cl_flight DEFINITION.\nENDCLASS.");
}

#[tokio::test]
async fn test_connected_system_is_browsable() {
    let h = Harness::start().await;
    seed_tree(&h);
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;
    assert!(vfs.roots().is_empty());

    let data = http_connection("dev", "A4H");
    h.manager.add_connection(data.clone()).await.unwrap();
    h.manager.connect(&data).await.unwrap();
    eventually(|| async move { vfs.roots() == vec![sid("A4H")] }).await;

    let listing = vfs.read_directory("adt://A4H").await.unwrap();
    assert_eq!(listing, vec![("Local Objects".to_string(), FileType::Directory)]);

    let listing = vfs
        .read_directory("adt://A4H/Local%20Objects")
        .await
        .unwrap();
    assert_eq!(
        listing,
        vec![
            (" \u{2044} DMO \u{2044} CL_FLIGHT.clas".to_string(), FileType::File),
            ("ZDEMO".to_string(), FileType::Directory),
        ]
    );
    assert_eq!(h.server.expand_calls(), 2);

    vfs.read_directory("adt://A4H/Local%20Objects").await.unwrap();
    assert_eq!(h.server.expand_calls(), 2);

    let source = vfs
        .read_file("adt://A4H/Local%20Objects/%20%E2%81%84%20DMO%20%E2%81%84%20CL_FLIGHT.clas")
        .await
        .unwrap();
    assert!(String::from_utf8(source).unwrap().starts_with("CLASS /dmo/cl_flight"));
}

#[tokio::test]
async fn test_disconnect_drops_cached_tree() {
    let h = Harness::start().await;
    seed_tree(&h);
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;

    let data = http_connection("dev", "A4H");
    h.manager.add_connection(data.clone()).await.unwrap();
    h.manager.connect(&data).await.unwrap();
    eventually(|| async move { !vfs.roots().is_empty() }).await;
    assert_eq!(vfs.read_directory("adt://A4H").await.unwrap().len(), 1);

    h.manager.disconnect(&data).await.unwrap();
    eventually(|| async move {
        vfs.read_directory("adt://A4H")
            .await
            .is_ok_and(|listing| listing.is_empty())
    })
    .await;
    let calls = h.server.expand_calls();

    // The root stays mounted while the system is offline
    assert_eq!(vfs.roots(), vec![sid("A4H")]);
    assert!(matches!(
        vfs.read_file("adt://A4H/Local%20Objects/ZDEMO").await,
        Err(VfsError::FileNotFound(_))
    ));
    assert_eq!(h.server.expand_calls(), calls);

    h.manager.connect(&data).await.unwrap();
    eventually(|| async move {
        vfs.read_directory("adt://A4H")
            .await
            .is_ok_and(|listing| listing.len() == 1)
    })
    .await;
    assert!(h.server.expand_calls() > calls);
}

#[tokio::test]
async fn test_removed_connection_is_unmounted() {
    let h = Harness::start().await;
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;

    let data = http_connection("dev", "A4H");
    h.manager.add_connection(data.clone()).await.unwrap();
    h.manager.connect(&data).await.unwrap();
    eventually(|| async move { !vfs.roots().is_empty() }).await;

    h.manager.disconnect(&data).await.unwrap();
    h.manager.remove_connection("dev").await.unwrap();
    eventually(|| async move { vfs.roots().is_empty() }).await;

    assert!(matches!(
        vfs.stat("adt://A4H").await,
        Err(VfsError::FileNotFound(_))
    ));
}

#[tokio::test]
async fn test_workspace_folders_are_mounted_on_attach() {
    let h = Harness::with_workspace(MemoryWorkspace::with_folders(vec![
        WorkspaceFolder::for_system(&sid("A4H")),
        WorkspaceFolder::for_system(&sid("NPL")),
    ]))
    .await;
    h.manager
        .add_connection(http_connection("dev", "A4H"))
        .await
        .unwrap();

    // NPL has a folder but no declared connection
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;
    assert_eq!(vfs.roots(), vec![sid("A4H")]);

    assert!(vfs.read_directory("adt://A4H").await.unwrap().is_empty());
    assert_eq!(h.server.expand_calls(), 0);
}

#[tokio::test]
async fn test_updated_connection_stays_mounted() {
    let h = Harness::with_workspace(MemoryWorkspace::with_folders(vec![
        WorkspaceFolder::for_system(&sid("A4H")),
        WorkspaceFolder::for_system(&sid("NPL")),
    ]))
    .await;
    h.manager
        .add_connection(http_connection("dev", "A4H"))
        .await
        .unwrap();
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;

    let updated = http_connection("dev", "A4H").with_description("renamed host");
    h.manager.update_connection("dev", updated).await.unwrap();

    // Events arrive in order: once NPL shows up the update has been applied
    h.manager
        .add_connection(http_connection("qa", "NPL"))
        .await
        .unwrap();
    eventually(|| async move { vfs.roots().contains(&sid("NPL")) }).await;

    assert_eq!(vfs.roots(), vec![sid("A4H"), sid("NPL")]);
}

#[tokio::test]
async fn test_server_hangup_lists_empty() {
    let h = Harness::start().await;
    seed_tree(&h);
    let (fs, _tracker) = VirtualFilesystem::attach(h.manager.clone()).await;
    let vfs: &VirtualFilesystem = &fs;

    let data = http_connection("dev", "A4H");
    h.manager.add_connection(data.clone()).await.unwrap();
    h.manager.connect(&data).await.unwrap();
    eventually(|| async move { !vfs.roots().is_empty() }).await;
    assert_eq!(vfs.read_directory("adt://A4H").await.unwrap().len(), 1);

    h.server.shutdown().await;

    // No RPC error at any point, only the cached listing or an empty one
    eventually(|| async move {
        vfs.read_directory("adt://A4H")
            .await
            .unwrap()
            .is_empty()
    })
    .await;
    assert!(h.manager.get_active(&sid("A4H")).is_none());
    assert_eq!(vfs.roots(), vec![sid("A4H")]);
    assert!(matches!(
        vfs.read_file("adt://A4H/Local%20Objects/ZDEMO").await,
        Err(VfsError::FileNotFound(_))
    ));
}
