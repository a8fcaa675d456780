//! CLI command implementations

mod browse;
mod config;
mod connections;
mod session;

pub use browse::{cat_command, ls_command, stat_command};
pub use config::{config_path, config_show};
pub use connections::{
    add_command, list_command, remove_command, test_command, HttpArgs, LogonArgs, RfcArgs,
};
pub use session::{connect_command, disconnect_command, restore_command};
