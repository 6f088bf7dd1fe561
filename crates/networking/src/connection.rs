//! TLS connections used to retrieve server certificates.

use std::sync::Arc;
use std::time::Duration;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::error::TlsError;

/// Default HTTPS port.
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Host and port of a TLS endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub host: String,
    pub port: u16,
}

impl ConnectionKey {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into().to_lowercase(),
            port,
        }
    }

    /// Build a key from an HTTPS URL.
    pub fn from_url(url: &Url) -> Result<Self, TlsError> {
        if url.scheme() != "https" {
            return Err(TlsError::NotSecure(url.scheme().to_string()));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TlsError::MissingHost(url.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(host, url.port().unwrap_or(DEFAULT_HTTPS_PORT)))
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Build a connector that verifies chains against the WebPKI roots.
pub fn webpki_connector() -> Result<TlsConnector, TlsError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Connect, complete a TLS handshake and return the leaf certificate (DER).
///
/// The whole exchange is bounded by `timeout`. A single attempt is made.
pub async fn fetch_peer_certificate(
    connector: &TlsConnector,
    key: &ConnectionKey,
    timeout: Duration,
) -> Result<Vec<u8>, TlsError> {
    let server_name = ServerName::try_from(key.host.clone())
        .map_err(|e| TlsError::InvalidUrl(format!("{}: {}", key.host, e)))?;

    let exchange = async {
        let stream = TcpStream::connect((key.host.as_str(), key.port))
            .await
            .map_err(|e| TlsError::Connection(e.to_string()))?;

        let tls = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| TlsError::Handshake(e.to_string()))?;

        let (_, connection) = tls.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|chain| chain.first())
            .map(|leaf| leaf.as_ref().to_vec())
            .ok_or(TlsError::MissingCertificate)?;
        Ok::<_, TlsError>(leaf)
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(TlsError::Timeout(timeout)),
    }
}
