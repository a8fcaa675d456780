//! adt-cli: Command-line host for ABAP remote connections
//!
//! Provides the `adt` CLI for declaring connections, connecting to systems
//! and browsing their repositories through the `adt://` filesystem.

pub mod commands;
pub mod host;
pub mod output;
