//! adt-vfs: Lazily populated virtual filesystem over ABAP repositories
//!
//! Every connected system is a root directory addressed as
//! `adt://<SYSTEM-ID>`. Directories are fetched from the language server
//! the first time they are listed and cached from then on. Objects are
//! files whose content is their source code.

pub mod error;
pub mod filesystem;
pub mod names;
pub mod provider;
pub mod tree;

pub use error::VfsError;
pub use filesystem::{FileStat, FileType, VirtualFilesystem};
pub use provider::NodeProvider;
pub use tree::{Children, TreeNode};
