//! In-memory copy of the repository tree

use adt_core::SystemId;
use adt_protocol::{FilesystemNode, NodeId};

use crate::filesystem::FileType;
use crate::names;

/// Children of a node as far as they are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    /// Never asked for, or thrown away
    NotFetched,
    /// Fetched, and there are none
    Empty,
    Populated(Vec<TreeNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    node: FilesystemNode,
    display_name: String,
    children: Children,
}

impl TreeNode {
    pub fn new(node: FilesystemNode) -> Self {
        let children = if node.is_expandable() {
            Children::NotFetched
        } else {
            Children::Empty
        };
        Self {
            display_name: names::display_name(&node),
            node,
            children,
        }
    }

    pub fn system_root(system_id: &SystemId) -> Self {
        Self::new(FilesystemNode::system_root(system_id.as_str()))
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_expandable(&self) -> bool {
        self.node.is_expandable()
    }

    pub fn file_type(&self) -> FileType {
        if self.is_expandable() {
            FileType::Directory
        } else {
            FileType::File
        }
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn is_fetched(&self) -> bool {
        !matches!(self.children, Children::NotFetched)
    }

    pub fn set_children(&mut self, nodes: Vec<FilesystemNode>) {
        self.children = if nodes.is_empty() {
            Children::Empty
        } else {
            Children::Populated(nodes.into_iter().map(TreeNode::new).collect())
        };
    }

    /// Child named by a path segment
    pub fn child(&self, file_name: &str) -> Option<&TreeNode> {
        match &self.children {
            Children::Populated(children) => children
                .iter()
                .find(|c| names::names_node(file_name, &c.node)),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, file_name: &str) -> Option<&mut TreeNode> {
        match &mut self.children {
            Children::Populated(children) => children
                .iter_mut()
                .find(|c| names::names_node(file_name, &c.node)),
            _ => None,
        }
    }

    /// `(file name, type)` of every known child
    pub fn listing(&self) -> Vec<(String, FileType)> {
        match &self.children {
            Children::Populated(children) => children
                .iter()
                .map(|c| (c.display_name.clone(), c.file_type()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_protocol::{GroupKind, ObjectKind};

    fn group(idx: u64, name: &str, group: GroupKind) -> FilesystemNode {
        FilesystemNode::Group {
            id: NodeId::new(idx, 1),
            name: name.into(),
            group,
        }
    }

    #[test]
    fn test_children_tri_state() {
        let mut root = TreeNode::system_root(&SystemId::new("A4H"));
        assert_eq!(root.children(), &Children::NotFetched);
        assert!(!root.is_fetched());

        root.set_children(Vec::new());
        assert_eq!(root.children(), &Children::Empty);
        assert!(root.is_fetched());

        root.set_children(vec![group(2, "Local Objects", GroupKind::LocalObjects)]);
        assert!(root.child("Local Objects").is_some());
        assert!(root.child("Local%20Objects").is_none());
    }

    #[test]
    fn test_child_lookup_by_file_name() {
        let mut package = TreeNode::new(FilesystemNode::RepositoryObject {
            id: NodeId::new(3, 1),
            name: "/DMO/FLIGHT".into(),
            object_kind: ObjectKind::Package,
        });
        package.set_children(vec![
            FilesystemNode::RepositoryObject {
                id: NodeId::new(7, 1),
                name: "/DMO/FLIGHT".into(),
                object_kind: ObjectKind::Class,
            },
            FilesystemNode::RepositoryObject {
                id: NodeId::new(8, 1),
                name: "/DMO/FLIGHT".into(),
                object_kind: ObjectKind::Interface,
            },
        ]);

        let class = package.child(" \u{2044} DMO \u{2044} FLIGHT.clas").unwrap();
        assert_eq!(class.id(), NodeId::new(7, 1));
        let interface = package.child(" \u{2044} DMO \u{2044} FLIGHT.intf").unwrap();
        assert_eq!(interface.id(), NodeId::new(8, 1));
        assert!(package.child("/DMO/FLIGHT.clas").is_none());
        assert!(package.child(" \u{2044} DMO \u{2044} FLIGHT").is_none());
    }

    #[test]
    fn test_leaves_have_no_children() {
        let leaf = TreeNode::new(FilesystemNode::RepositoryObject {
            id: NodeId::new(9, 1),
            name: "ZREPORT".into(),
            object_kind: ObjectKind::Program,
        });
        assert_eq!(leaf.children(), &Children::Empty);
        assert!(leaf.is_fetched());
        assert_eq!(leaf.file_type(), FileType::File);
        assert_eq!(leaf.display_name(), "ZREPORT.prog");
    }

    #[test]
    fn test_listing_uses_file_names() {
        let mut root = TreeNode::system_root(&SystemId::new("A4H"));
        root.set_children(vec![
            group(2, "Local Objects", GroupKind::LocalObjects),
            FilesystemNode::RepositoryObject {
                id: NodeId::new(3, 1),
                name: "/DMO/FLIGHT".into(),
                object_kind: ObjectKind::Package,
            },
        ]);

        assert_eq!(
            root.listing(),
            vec![
                ("Local Objects".to_string(), FileType::Directory),
                (" \u{2044} DMO \u{2044} FLIGHT".to_string(), FileType::Directory),
            ]
        );
    }
}
