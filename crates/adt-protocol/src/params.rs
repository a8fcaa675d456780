//! Connection parameters understood by `connection/connect`
//!
//! A system is reached either through the ADT HTTP(S) service or through
//! the RFC protocol. The JSON shape is flat: the protocol specific fields
//! sit next to `client` and `language`, discriminated by `protocol`.

use serde::{Deserialize, Serialize};

/// Parameters identifying how to reach and log on to a system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    /// Logon client, e.g. `001`
    pub client: String,
    /// Logon language, e.g. `en`
    pub language: String,
    #[serde(flatten)]
    pub protocol: ProtocolParams,
}

impl ConnectionParams {
    pub const DEFAULT_CLIENT: &'static str = "001";
    pub const DEFAULT_LANGUAGE: &'static str = "en";

    /// HTTPS on the local loopback, as used by the developer edition images
    pub fn default_http() -> Self {
        Self {
            client: Self::DEFAULT_CLIENT.into(),
            language: Self::DEFAULT_LANGUAGE.into(),
            protocol: ProtocolParams::Http(HttpParams::default()),
        }
    }

    pub fn default_rfc() -> Self {
        Self {
            client: Self::DEFAULT_CLIENT.into(),
            language: Self::DEFAULT_LANGUAGE.into(),
            protocol: ProtocolParams::Rfc(RfcParams::default()),
        }
    }

    /// Short human readable target, used in listings and logs
    pub fn endpoint(&self) -> String {
        match &self.protocol {
            ProtocolParams::Http(http) => {
                let scheme = if http.ssl { "https" } else { "http" };
                format!("{}://{}:{}", scheme, http.hostname, http.port)
            }
            ProtocolParams::Rfc(rfc) => match &rfc.target {
                RfcTarget::CustomApplicationServer(server) => format!(
                    "rfc://{}/{}",
                    server.application_server, server.instance_number
                ),
                RfcTarget::GroupSelection(group) => {
                    format!("rfc://{}/{}", group.message_server, group.group)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolParams {
    Http(HttpParams),
    Rfc(RfcParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpParams {
    pub hostname: String,
    pub port: u16,
    pub ssl: bool,
    /// PEM encoded certificate to trust in addition to the system store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_certificate: Option<String>,
    #[serde(default)]
    pub accept_invalid_hostname: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".into(),
            port: 50001,
            ssl: true,
            custom_certificate: None,
            accept_invalid_hostname: false,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfcParams {
    pub snc_enabled: bool,
    pub sso_enabled: bool,
    #[serde(default)]
    pub snc_name: String,
    pub snc_level: SncLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sap_router_string: Option<String>,
    #[serde(flatten)]
    pub target: RfcTarget,
}

impl Default for RfcParams {
    fn default() -> Self {
        Self {
            snc_enabled: true,
            sso_enabled: true,
            snc_name: String::new(),
            snc_level: SncLevel::Highest,
            sap_router_string: None,
            target: RfcTarget::CustomApplicationServer(ApplicationServer {
                application_server: String::new(),
                instance_number: "00".into(),
                rfc_gateway_server: None,
                rfc_gateway_server_port: None,
            }),
        }
    }
}

/// Secure network communication protection level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SncLevel {
    Highest,
    Encrypted,
    Signed,
    Authed,
}

/// How the RFC logon finds an application server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "connectionType", rename_all = "snake_case")]
pub enum RfcTarget {
    /// Log on to one specific application server
    CustomApplicationServer(ApplicationServer),
    /// Let the message server pick a server from a logon group
    GroupSelection(MessageServerGroup),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationServer {
    pub application_server: String,
    pub instance_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfc_gateway_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfc_gateway_server_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageServerGroup {
    pub message_server: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_server_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_params_are_flat() {
        let value = serde_json::to_value(ConnectionParams::default_http()).unwrap();
        assert_eq!(
            value,
            json!({
                "client": "001",
                "language": "en",
                "protocol": "http",
                "hostname": "127.0.0.1",
                "port": 50001,
                "ssl": true,
                "acceptInvalidHostname": false,
                "acceptInvalidCerts": false
            })
        );
    }

    #[test]
    fn test_rfc_group_selection() {
        let params: ConnectionParams = serde_json::from_value(json!({
            "client": "100",
            "language": "de",
            "protocol": "rfc",
            "connectionType": "group_selection",
            "sncEnabled": false,
            "ssoEnabled": false,
            "sncLevel": "signed",
            "messageServer": "ms.example.com",
            "group": "PUBLIC",
            "messageServerPort": 3600
        }))
        .unwrap();

        let ProtocolParams::Rfc(rfc) = &params.protocol else {
            panic!("Expected RFC parameters");
        };
        assert_eq!(rfc.snc_level, SncLevel::Signed);
        assert_eq!(
            rfc.target,
            RfcTarget::GroupSelection(MessageServerGroup {
                message_server: "ms.example.com".into(),
                group: "PUBLIC".into(),
                message_server_port: Some(3600),
            })
        );
        assert_eq!(params.endpoint(), "rfc://ms.example.com/PUBLIC");
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let result: Result<ConnectionParams, _> = serde_json::from_value(json!({
            "client": "001",
            "language": "en",
            "protocol": "ftp"
        }));
        assert!(result.is_err());
    }
}
