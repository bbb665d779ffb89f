use crate::utils::error::{RestError, Result};
use axum_server::tls_rustls::RustlsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIDENTIAL_PORT: u16 = 443;
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(500_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpVersion {
    #[default]
    #[serde(rename = "HTTP/1.1")]
    Http11,
    #[serde(rename = "HTTP/2")]
    Http2,
}

impl HttpVersion {
    /// ALPN protocols offered by the TLS listener.
    pub fn alpn_protocols(&self) -> Vec<Vec<u8>> {
        match self {
            HttpVersion::Http11 => vec![b"http/1.1".to_vec()],
            HttpVersion::Http2 => vec![b"h2".to_vec(), b"http/1.1".to_vec()],
        }
    }
}

/// Secure listener settings.
///
/// The keystore is a PEM bundle holding the certificate chain followed by
/// the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslConfig {
    keystore: PathBuf,
    confidential_port: u16,
    scheme: String,
    idle_timeout: Duration,
    http_version: HttpVersion,
}

impl SslConfig {
    pub fn new(keystore: impl Into<PathBuf>) -> Self {
        Self {
            keystore: keystore.into(),
            confidential_port: DEFAULT_CONFIDENTIAL_PORT,
            scheme: DEFAULT_SCHEME.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            http_version: HttpVersion::default(),
        }
    }

    /// `$HOME/keystore`, or `./keystore` when no home directory is known.
    pub fn default_keystore() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keystore")
    }

    pub fn confidential_port(mut self, port: u16) -> Self {
        self.confidential_port = port;
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn http_version(mut self, http_version: HttpVersion) -> Self {
        self.http_version = http_version;
        self
    }

    pub fn keystore(&self) -> &Path {
        &self.keystore
    }

    /// Loads the keystore and builds the TLS listener settings. The keystore
    /// must exist beforehand.
    pub fn build(&self) -> Result<SslListener> {
        if !self.keystore.exists() {
            return Err(RestError::KeystoreNotFound {
                path: self.keystore.display().to_string(),
            });
        }

        let server_config = self.load_server_config()?;
        tracing::info!(
            "🔒 SSL enabled: {}://[host]:{} (idle timeout {:?}, {:?})",
            self.scheme,
            self.confidential_port,
            self.idle_timeout,
            self.http_version
        );

        Ok(SslListener {
            port: self.confidential_port,
            scheme: self.scheme.clone(),
            idle_timeout: self.idle_timeout,
            tls: RustlsConfig::from_config(Arc::new(server_config)),
        })
    }

    fn load_server_config(&self) -> Result<rustls::ServerConfig> {
        let pem = std::fs::read(&self.keystore)?;

        let mut reader = pem.as_slice();
        let certs = rustls_pemfile::certs(&mut reader).collect::<std::result::Result<Vec<_>, _>>()?;
        if certs.is_empty() {
            return Err(RestError::TlsError {
                message: format!("no certificate in {}", self.keystore.display()),
            });
        }

        let mut reader = pem.as_slice();
        let key = rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| RestError::TlsError {
            message: format!("no private key in {}", self.keystore.display()),
        })?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(tls_error)?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(tls_error)?;
        config.alpn_protocols = self.http_version.alpn_protocols();

        Ok(config)
    }
}

fn tls_error(e: rustls::Error) -> RestError {
    RestError::TlsError {
        message: e.to_string(),
    }
}

/// A ready-to-bind TLS listener.
#[derive(Clone)]
pub struct SslListener {
    pub port: u16,
    pub scheme: String,
    pub idle_timeout: Duration,
    pub tls: RustlsConfig,
}

impl std::fmt::Debug for SslListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SslListener")
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SslConfig::new("/tmp/keystore.pem");
        assert_eq!(config.confidential_port, 443);
        assert_eq!(config.scheme, "https");
        assert_eq!(config.idle_timeout, Duration::from_millis(500_000));
        assert_eq!(config.http_version, HttpVersion::Http11);
        assert!(SslConfig::default_keystore().ends_with("keystore"));
    }

    #[test]
    fn test_missing_keystore_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = SslConfig::new(dir.path().join("absent.pem"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RestError::KeystoreNotFound { .. }));
    }

    #[test]
    fn test_keystore_without_certificate_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not a pem bundle").unwrap();

        let err = SslConfig::new(file.path()).build().unwrap_err();
        assert!(matches!(err, RestError::TlsError { .. }));
    }

    #[test]
    fn test_alpn_follows_http_version() {
        assert_eq!(HttpVersion::Http11.alpn_protocols(), vec![b"http/1.1".to_vec()]);
        assert_eq!(HttpVersion::Http2.alpn_protocols().len(), 2);
    }
}
