//! Where logon material comes from
//!
//! Storing secrets is the host's business. The manager only asks for them
//! right before a connection attempt.

use adt_core::{ConnectionData, ConnectionError};
use adt_protocol::Authentication;

pub trait CredentialProvider: Send + Sync {
    fn credentials(&self, connection: &ConnectionData) -> Result<Authentication, ConnectionError>;
}

/// The same credentials for every system
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Authentication);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self, _connection: &ConnectionData) -> Result<Authentication, ConnectionError> {
        Ok(self.0.clone())
    }
}

/// User and password from the environment
///
/// `ADT_<SID>_USER`/`ADT_<SID>_PASSWORD` win over `ADT_USER`/`ADT_PASSWORD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn lookup(system: &str, field: &str) -> Option<String> {
        std::env::var(format!("ADT_{}_{}", system, field))
            .or_else(|_| std::env::var(format!("ADT_{}", field)))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self, connection: &ConnectionData) -> Result<Authentication, ConnectionError> {
        let system = connection.system_id.as_str();
        match (Self::lookup(system, "USER"), Self::lookup(system, "PASSWORD")) {
            (Some(username), Some(password)) => Ok(Authentication::password(username, password)),
            _ => Err(ConnectionError::Credentials(format!(
                "{} (set ADT_{}_USER and ADT_{}_PASSWORD)",
                system, system, system
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adt_protocol::ConnectionParams;

    #[test]
    fn test_env_credentials_per_system() {
        std::env::set_var("ADT_ZCRED_USER", "DEVELOPER");
        std::env::set_var("ADT_ZCRED_PASSWORD", "secret");

        let data = ConnectionData::new("cred", "zcred", ConnectionParams::default_http());
        let auth = EnvCredentials.credentials(&data).unwrap();
        assert_eq!(auth, Authentication::password("DEVELOPER", "secret"));

        std::env::remove_var("ADT_ZCRED_USER");
        std::env::remove_var("ADT_ZCRED_PASSWORD");
    }

    #[test]
    fn test_env_credentials_missing() {
        let data = ConnectionData::new("none", "zmissing", ConnectionParams::default_http());
        if std::env::var("ADT_USER").is_err() {
            assert!(matches!(
                EnvCredentials.credentials(&data),
                Err(ConnectionError::Credentials(_))
            ));
        }
    }
}
