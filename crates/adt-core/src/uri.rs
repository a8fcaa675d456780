//! `adt://` URIs addressing the virtual filesystem
//!
//! The authority is the system id, the path walks the repository tree by
//! display name: `adt://A4H/Local Objects/$TMP/ZREPORT.prog`. Segments are
//! percent-encoded when rendered.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;
use std::str::FromStr;

use crate::error::UriError;
use crate::types::SystemId;

pub const ADT_URI_SCHEME: &str = "adt";

// Non-ASCII is always escaped by `utf8_percent_encode`.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Workspace folder URI of a system
pub fn connection_uri(system_id: &SystemId) -> String {
    format!("{}://{}", ADT_URI_SCHEME, system_id)
}

/// A parsed `adt://` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdtUri {
    pub system_id: SystemId,
    /// Decoded path segments below the system root
    pub segments: Vec<String>,
}

impl AdtUri {
    pub fn root(system_id: SystemId) -> Self {
        Self {
            system_id,
            segments: Vec::new(),
        }
    }

    pub fn parse(uri: &str) -> Result<Self, UriError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| UriError::Scheme(uri.to_string()))?;
        if !scheme.eq_ignore_ascii_case(ADT_URI_SCHEME) {
            return Err(UriError::Scheme(uri.to_string()));
        }

        // Query and fragment carry nothing for the filesystem.
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        if authority.is_empty() {
            return Err(UriError::MissingSystem(uri.to_string()));
        }

        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                percent_decode_str(segment)
                    .decode_utf8()
                    .map(|decoded| decoded.into_owned())
                    .map_err(|_| UriError::Encoding(segment.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            system_id: SystemId::new(authority),
            segments,
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(segment.into());
        child
    }

    /// Last path segment, the system id for the root
    pub fn file_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or(self.system_id.as_str())
    }
}

impl fmt::Display for AdtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", connection_uri(&self.system_id))?;
        for segment in &self.segments {
            write!(f, "/{}", utf8_percent_encode(segment, SEGMENT))?;
        }
        Ok(())
    }
}

impl FromStr for AdtUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root() {
        let uri = AdtUri::parse("adt://a4h").unwrap();
        assert_eq!(uri.system_id, SystemId::new("A4H"));
        assert!(uri.is_root());
        assert_eq!(uri.file_name(), "A4H");

        assert_eq!(AdtUri::parse("adt://A4H/").unwrap(), uri);
    }

    #[test]
    fn test_parse_decodes_segments() {
        let uri = AdtUri::parse("adt://A4H/Local%20Objects/%2FDMO%2F/Z%20%E2%81%84%20X.prog").unwrap();
        assert_eq!(
            uri.segments,
            vec!["Local Objects", "/DMO/", "Z \u{2044} X.prog"]
        );
    }

    #[test]
    fn test_display_encodes_segments() {
        let uri = AdtUri::root(SystemId::new("A4H"))
            .join("Local Objects")
            .join("\u{2044}DMO\u{2044}");
        let rendered = uri.to_string();
        assert_eq!(rendered, "adt://A4H/Local%20Objects/%E2%81%84DMO%E2%81%84");
        assert_eq!(AdtUri::parse(&rendered).unwrap(), uri);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            AdtUri::parse("file:///tmp/x"),
            Err(UriError::Scheme(_))
        ));
        assert!(matches!(
            AdtUri::parse("adt:///path"),
            Err(UriError::MissingSystem(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        assert!(matches!(
            AdtUri::parse("adt://A4H/%FF"),
            Err(UriError::Encoding(_))
        ));
    }
}
