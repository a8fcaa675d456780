//! Terminal output for the CLI
//!
//! Tables for connection listings and directory contents, plus coloured
//! one-line status messages.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use adt_core::{ConnectionData, SystemId};
use adt_protocol::ProtocolParams;
use adt_vfs::{FileStat, FileType};

/// Format declared connections as a table
///
/// `parked` systems were active when the previous run ended and are
/// reattached by the next command that talks to the server.
pub fn format_connections(connections: &[ConnectionData], parked: &[SystemId], long: bool) -> String {
    if connections.is_empty() {
        return "No connections declared".to_string();
    }

    #[derive(Tabled)]
    struct ConnectionRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SYSTEM")]
        system: String,
        #[tabled(rename = "ENDPOINT")]
        endpoint: String,
        #[tabled(rename = "STATE")]
        state: &'static str,
    }

    #[derive(Tabled)]
    struct ConnectionRowDetailed {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SYSTEM")]
        system: String,
        #[tabled(rename = "PROTOCOL")]
        protocol: &'static str,
        #[tabled(rename = "ENDPOINT")]
        endpoint: String,
        #[tabled(rename = "CLIENT")]
        client: String,
        #[tabled(rename = "STATE")]
        state: &'static str,
        #[tabled(rename = "DESCRIPTION")]
        description: String,
    }

    let state = |c: &ConnectionData| {
        if c.is_connected() {
            "connected"
        } else if parked.contains(&c.system_id) {
            "parked"
        } else {
            "disconnected"
        }
    };

    if long {
        let rows: Vec<ConnectionRowDetailed> = connections
            .iter()
            .map(|c| ConnectionRowDetailed {
                name: c.name.clone(),
                system: c.system_id.to_string(),
                protocol: match c.params.protocol {
                    ProtocolParams::Http(_) => "http",
                    ProtocolParams::Rfc(_) => "rfc",
                },
                endpoint: c.params.endpoint(),
                client: c.params.client.clone(),
                state: state(c),
                description: if c.description.is_empty() {
                    "-".to_string()
                } else {
                    c.description.clone()
                },
            })
            .collect();

        Table::new(rows)
            .with(Style::rounded())
            .with(Width::wrap(120))
            .to_string()
    } else {
        let rows: Vec<ConnectionRow> = connections
            .iter()
            .map(|c| ConnectionRow {
                name: c.name.clone(),
                system: c.system_id.to_string(),
                endpoint: c.params.endpoint(),
                state: state(c),
            })
            .collect();

        Table::new(rows).with(Style::rounded()).to_string()
    }
}

/// One entry per line, directories marked with a trailing `/`
pub fn format_listing(entries: &[(String, FileType)]) -> String {
    entries
        .iter()
        .map(|(name, file_type)| match file_type {
            FileType::Directory => format!("{}/", name),
            FileType::File => name.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_stat(uri: &str, stat: &FileStat) -> String {
    let kind = match stat.file_type {
        FileType::Directory => "directory",
        FileType::File => "file",
    };
    format!("{}\n  name: {}\n  type: {}", uri, stat.name, kind)
}

fn print_marked(out: &mut impl Write, color: Color, mark: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(mark),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Green check mark on stdout
pub fn print_success(msg: &str) {
    print_marked(&mut std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Red cross on stderr
pub fn print_error(msg: &str) {
    print_marked(&mut std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Yellow warning sign on stderr
pub fn print_warning(msg: &str) {
    print_marked(&mut std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Stderr as well, so that `adt cat` output stays clean
pub fn print_info(msg: &str) {
    print_marked(&mut std::io::stderr(), Color::Cyan, "ℹ ", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_protocol::ConnectionParams;

    #[test]
    fn test_listing_marks_directories() {
        let entries = vec![
            ("Local Objects".to_string(), FileType::Directory),
            ("ZREPORT.prog".to_string(), FileType::File),
        ];
        assert_eq!(format_listing(&entries), "Local Objects/\nZREPORT.prog");
        assert_eq!(format_listing(&[]), "");
    }

    #[test]
    fn test_connection_states() {
        let connections = vec![
            ConnectionData::new("dev", "A4H", ConnectionParams::default_http()),
            ConnectionData::new("qa", "NPL", ConnectionParams::default_rfc()),
        ];
        let table = format_connections(&connections, &[SystemId::new("NPL")], false);
        assert!(table.contains("dev"));
        assert!(table.contains("https://127.0.0.1:50001"));
        assert!(table.contains("disconnected"));
        assert!(table.contains("parked"));

        assert_eq!(
            format_connections(&[], &[], true),
            "No connections declared"
        );
    }
}
