//! Connection catalog commands

use anyhow::{bail, Context, Result};
use clap::Args;

use adt_core::ConnectionData;
use adt_protocol::{
    ApplicationServer, ConnectionParams, HttpParams, MessageServerGroup, ProtocolParams, RfcParams,
    RfcTarget, SncLevel,
};

use crate::host::Host;
use crate::output::{format_connections, print_error, print_success};

/// Settings shared by every protocol
#[derive(Args, Debug)]
pub struct LogonArgs {
    /// Unique connection name
    pub name: String,
    /// System id, e.g. A4H
    #[arg(short, long)]
    pub system: String,
    /// Logon client
    #[arg(long, default_value = ConnectionParams::DEFAULT_CLIENT)]
    pub client: String,
    /// Logon language
    #[arg(long, default_value = ConnectionParams::DEFAULT_LANGUAGE)]
    pub language: String,
    /// Free text shown in listings
    #[arg(short, long)]
    pub description: Option<String>,
}

impl LogonArgs {
    fn into_data(self, protocol: ProtocolParams) -> ConnectionData {
        let params = ConnectionParams {
            client: self.client,
            language: self.language,
            protocol,
        };
        let data = ConnectionData::new(self.name, self.system, params);
        match self.description {
            Some(description) => data.with_description(description),
            None => data,
        }
    }
}

/// Connection through the ADT HTTP service
#[derive(Args, Debug)]
pub struct HttpArgs {
    #[command(flatten)]
    pub logon: LogonArgs,
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 50001)]
    pub port: u16,
    /// Plain HTTP instead of HTTPS
    #[arg(long)]
    pub no_ssl: bool,
    /// PEM file with an extra certificate to trust
    #[arg(long)]
    pub certificate: Option<std::path::PathBuf>,
    /// Accept certificates that fail validation
    #[arg(long)]
    pub accept_invalid_certs: bool,
}

impl HttpArgs {
    pub fn into_data(self) -> Result<ConnectionData> {
        let custom_certificate = match &self.certificate {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read certificate {:?}", path))?,
            ),
            None => None,
        };
        let http = HttpParams {
            hostname: self.host,
            port: self.port,
            ssl: !self.no_ssl,
            custom_certificate,
            accept_invalid_hostname: self.accept_invalid_certs,
            accept_invalid_certs: self.accept_invalid_certs,
        };
        Ok(self.logon.into_data(ProtocolParams::Http(http)))
    }
}

/// Connection through RFC
#[derive(Args, Debug)]
pub struct RfcArgs {
    #[command(flatten)]
    pub logon: LogonArgs,
    /// Application server to log on to
    #[arg(long, conflicts_with_all = ["message_server", "group"])]
    pub server: Option<String>,
    #[arg(long, default_value = "00")]
    pub instance: String,
    /// Message server for logon group selection
    #[arg(long, requires = "group")]
    pub message_server: Option<String>,
    /// Logon group
    #[arg(long, requires = "message_server")]
    pub group: Option<String>,
    /// SAProuter string
    #[arg(long)]
    pub router: Option<String>,
    /// SNC name of the partner
    #[arg(long, default_value = "")]
    pub snc_name: String,
    /// SNC protection level: highest, encrypted, signed or authed
    #[arg(long, default_value = "highest", value_parser = parse_snc_level)]
    pub snc_level: SncLevel,
    /// Disable secure network communication
    #[arg(long)]
    pub no_snc: bool,
    /// Disable single sign-on
    #[arg(long)]
    pub no_sso: bool,
}

fn parse_snc_level(level: &str) -> Result<SncLevel, String> {
    match level.to_ascii_lowercase().as_str() {
        "highest" => Ok(SncLevel::Highest),
        "encrypted" => Ok(SncLevel::Encrypted),
        "signed" => Ok(SncLevel::Signed),
        "authed" => Ok(SncLevel::Authed),
        other => Err(format!("unknown SNC level '{}'", other)),
    }
}

impl RfcArgs {
    pub fn into_data(self) -> Result<ConnectionData> {
        let target = match (self.server, self.message_server, self.group) {
            (Some(application_server), None, None) => {
                RfcTarget::CustomApplicationServer(ApplicationServer {
                    application_server,
                    instance_number: self.instance,
                    rfc_gateway_server: None,
                    rfc_gateway_server_port: None,
                })
            }
            (None, Some(message_server), Some(group)) => {
                RfcTarget::GroupSelection(MessageServerGroup {
                    message_server,
                    group,
                    message_server_port: None,
                })
            }
            _ => bail!("Give either --server or --message-server with --group"),
        };
        let rfc = RfcParams {
            snc_enabled: !self.no_snc,
            sso_enabled: !self.no_sso,
            snc_name: self.snc_name,
            snc_level: self.snc_level,
            sap_router_string: self.router,
            target,
        };
        Ok(self.logon.into_data(ProtocolParams::Rfc(rfc)))
    }
}

/// Execute the list command
pub async fn list_command(host: &Host, long: bool) -> Result<()> {
    let connections = host.manager().connections().await;
    let parked = host.parked()?;
    println!("{}", format_connections(&connections, &parked, long));
    Ok(())
}

pub async fn add_command(host: &Host, data: ConnectionData) -> Result<()> {
    let (name, system_id) = (data.name.clone(), data.system_id.clone());
    host.manager()
        .add_connection(data)
        .await
        .with_context(|| format!("Failed to add connection '{}'", name))?;
    print_success(&format!("Added connection '{}' to {}", name, system_id));
    Ok(())
}

pub async fn remove_command(host: &Host, name: &str) -> Result<()> {
    let removed = host
        .manager()
        .remove_connection(name)
        .await
        .with_context(|| format!("Failed to remove connection '{}'", name))?;
    print_success(&format!("Removed connection '{}' ({})", name, removed.system_id));
    Ok(())
}

/// Log on once and report; leaves no session behind
pub async fn test_command(host: &Host, name: &str) -> Result<()> {
    let data = host.find(name).await?;
    let result = host.manager().test_connect(&data).await;
    if result.success {
        print_success(&result.message);
        Ok(())
    } else {
        print_error(&result.message);
        bail!("Connection test for '{}' failed", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Rfc {
        #[command(flatten)]
        args: RfcArgs,
    }

    #[test]
    fn test_rfc_group_selection() {
        let rfc = Rfc::try_parse_from([
            "adt", "qa", "-s", "npl", "--message-server", "ms.example", "--group", "PUBLIC",
        ])
        .unwrap();
        let data = rfc.args.into_data().unwrap();
        assert_eq!(data.system_id.as_str(), "NPL");
        assert_eq!(data.params.endpoint(), "rfc://ms.example/PUBLIC");
    }

    #[test]
    fn test_rfc_needs_a_target() {
        let rfc = Rfc::try_parse_from(["adt", "qa", "-s", "NPL"]).unwrap();
        assert!(rfc.args.into_data().is_err());

        assert!(Rfc::try_parse_from([
            "adt", "qa", "-s", "NPL", "--server", "app", "--message-server", "ms", "--group", "G",
        ])
        .is_err());
    }

    #[test]
    fn test_snc_levels() {
        assert_eq!(parse_snc_level("Signed").unwrap(), SncLevel::Signed);
        assert!(parse_snc_level("loud").is_err());
    }
}
