//! Mapping between repository names and file names
//!
//! Repository names may contain `/` (namespaces such as `/DMO/`), which no
//! file name can. It is shown as ` ⁄ ` instead: a space, U+2044 FRACTION
//! SLASH, a space. Objects other than packages additionally get a type
//! extension so that editors can pick a language.

use adt_protocol::FilesystemNode;

/// Stand-in for `/` inside file names
pub const SLASH_SUBSTITUTE: &str = " \u{2044} ";

pub fn mangle(name: &str) -> String {
    name.replace('/', SLASH_SUBSTITUTE)
}

pub fn unmangle(name: &str) -> String {
    name.replace(SLASH_SUBSTITUTE, "/")
}

fn extension(node: &FilesystemNode) -> Option<String> {
    match node {
        FilesystemNode::RepositoryObject { object_kind, .. } => object_kind.extension(),
        _ => None,
    }
}

/// File name of a node
pub fn display_name(node: &FilesystemNode) -> String {
    let name = mangle(node.name());
    match extension(node) {
        Some(extension) => format!("{}.{}", name, extension),
        None => name,
    }
}

/// Repository name behind a file name, if it is the file name of a node
/// of that kind
///
/// The type extension has to match too, so a class and a program of the
/// same name stay apart. Groups and facets carry no extension.
pub fn real_name(file_name: &str, node: &FilesystemNode) -> Option<String> {
    let stem = match extension(node) {
        Some(extension) => file_name
            .strip_suffix(extension.as_str())?
            .strip_suffix('.')?,
        None => file_name,
    };
    // A bare `/` is never produced by `mangle`
    if stem.contains('/') {
        return None;
    }
    Some(unmangle(stem))
}

/// Whether `file_name` names `node`
pub fn names_node(file_name: &str, node: &FilesystemNode) -> bool {
    real_name(file_name, node).is_some_and(|name| name == node.name())
}
