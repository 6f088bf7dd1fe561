//! Peer certificate details and host checks.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use x509_parser::prelude::{AttributeTypeAndValue, GeneralName, X509Name};

use crate::error::TlsError;

/// Subject alternative name type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SanType {
    #[serde(rename = "DNS")]
    Dns,
    #[serde(rename = "IP Address")]
    IpAddress,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "URI")]
    Uri,
    #[serde(rename = "DirName")]
    DirName,
}

impl SanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanType::Dns => "DNS",
            SanType::IpAddress => "IP Address",
            SanType::Email => "email",
            SanType::Uri => "URI",
            SanType::DirName => "DirName",
        }
    }
}

/// One subject alternative name entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SanEntry {
    pub kind: SanType,
    pub value: String,
}

impl SanEntry {
    pub fn new(kind: SanType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// A DNS name entry.
    pub fn dns(value: impl Into<String>) -> Self {
        Self::new(SanType::Dns, value)
    }

    fn from_general_name(name: &GeneralName<'_>) -> Option<Self> {
        match name {
            GeneralName::DNSName(value) => Some(Self::dns(*value)),
            GeneralName::RFC822Name(value) => Some(Self::new(SanType::Email, *value)),
            GeneralName::URI(value) => Some(Self::new(SanType::Uri, *value)),
            GeneralName::IPAddress(bytes) => {
                format_ip(bytes).map(|ip| Self::new(SanType::IpAddress, ip))
            }
            GeneralName::DirectoryName(name) => Some(Self::new(SanType::DirName, name.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for SanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

fn format_ip(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(Ipv4Addr::from(octets).to_string())
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(Ipv6Addr::from(octets).to_string())
        }
        _ => None,
    }
}

/// Details of a server certificate, as shown in the certificate viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CertificateSnapshot {
    /// Subject attributes keyed by long name (`commonName`, ...).
    pub subject: BTreeMap<String, String>,
    /// Issuer attributes keyed by long name.
    pub issuer: BTreeMap<String, String>,
    /// X.509 version (3 for v3 certificates).
    pub version: u32,
    /// Serial number in upper-case hex.
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Subject alternative names in certificate order.
    pub subject_alt_names: Vec<SanEntry>,
    /// SHA-256 of the DER encoding, lower-case hex.
    pub fingerprint_sha256: String,
}

impl CertificateSnapshot {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, TlsError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| TlsError::CertificateFormat(e.to_string()))?;

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp())?;
        let not_after = timestamp(validity.not_after.timestamp())?;

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(extension)) => extension
                .value
                .general_names
                .iter()
                .filter_map(SanEntry::from_general_name)
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => return Err(TlsError::CertificateFormat(e.to_string())),
        };

        let serial: String = cert
            .tbs_certificate
            .raw_serial()
            .iter()
            .skip_while(|byte| **byte == 0)
            .map(|byte| format!("{:02X}", byte))
            .collect();

        Ok(Self {
            subject: name_attributes(cert.subject()),
            issuer: name_attributes(cert.issuer()),
            version: cert.version().0 + 1,
            serial_number: if serial.is_empty() { "00".to_string() } else { serial },
            not_before,
            not_after,
            subject_alt_names,
            fingerprint_sha256: fingerprint(der),
        })
    }

    /// Subject common name, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.subject.get("commonName").map(String::as_str)
    }

    /// Issuer common name, if any.
    pub fn issuer_common_name(&self) -> Option<&str> {
        self.issuer.get("commonName").map(String::as_str)
    }

    /// DNS names from the subject alternative names.
    pub fn dns_names(&self) -> impl Iterator<Item = &str> {
        self.subject_alt_names
            .iter()
            .filter(|san| san.kind == SanType::Dns)
            .map(|san| san.value.as_str())
    }

    /// Check if the certificate has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after <= now
    }

    /// Check if the certificate names `hostname`.
    ///
    /// Accepts an exact DNS SAN, the subject common name, an IP SAN equal to
    /// an IP literal host, or a `*.suffix` SAN when the host ends with
    /// `.suffix` and has at least one label in front of it.
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        let host = hostname.trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return false;
        }

        if self.dns_names().any(|name| name.eq_ignore_ascii_case(&host)) {
            return true;
        }
        if self
            .common_name()
            .is_some_and(|cn| cn.eq_ignore_ascii_case(&host))
        {
            return true;
        }
        if self
            .subject_alt_names
            .iter()
            .any(|san| san.kind == SanType::IpAddress && san.value == host)
        {
            return true;
        }

        self.dns_names().any(|name| {
            let name = name.to_lowercase();
            match name.strip_prefix('*') {
                Some(suffix) if suffix.starts_with('.') => {
                    host.len() > suffix.len() && host.ends_with(suffix)
                }
                _ => false,
            }
        })
    }

    /// Check expiry and hostname at `now`. Expiry is checked first.
    pub fn validate_for_host(&self, hostname: &str, now: DateTime<Utc>) -> Result<(), TlsError> {
        if self.is_expired_at(now) {
            return Err(TlsError::Expired {
                not_after: self.not_after,
            });
        }
        if !self.matches_hostname(hostname) {
            return Err(TlsError::HostnameMismatch(hostname.to_string()));
        }
        Ok(())
    }

    /// Summary lines for a details dialog.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Subject: {}", self.common_name().unwrap_or("N/A")),
            format!("Issuer: {}", self.issuer_common_name().unwrap_or("N/A")),
            format!("Valid From: {}", self.not_before.to_rfc2822()),
            format!("Valid Until: {}", self.not_after.to_rfc2822()),
            format!("Serial Number: {}", self.serial_number),
        ];
        let names: Vec<&str> = self.dns_names().collect();
        if !names.is_empty() {
            lines.push(format!("Subject Alternative Names: {}", names.join(", ")));
        }
        lines
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TlsError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| TlsError::CertificateFormat(format!("validity time out of range: {}", secs)))
}

fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn name_attributes(name: &X509Name<'_>) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    insert_first(&mut attributes, "commonName", name.iter_common_name());
    insert_first(&mut attributes, "organizationName", name.iter_organization());
    insert_first(&mut attributes, "organizationalUnitName", name.iter_organizational_unit());
    insert_first(&mut attributes, "countryName", name.iter_country());
    insert_first(&mut attributes, "stateOrProvinceName", name.iter_state_or_province());
    insert_first(&mut attributes, "localityName", name.iter_locality());
    attributes
}

fn insert_first<'n, 'a: 'n>(
    attributes: &mut BTreeMap<String, String>,
    key: &str,
    mut values: impl Iterator<Item = &'n AttributeTypeAndValue<'a>>,
) {
    if let Some(value) = values.find_map(|attr| attr.as_str().ok()) {
        attributes.insert(key.to_string(), value.to_string());
    }
}
