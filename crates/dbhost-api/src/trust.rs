// Pinned trust anchor
//
// The API is only ever reached over TLS that chains to a fixed certificate
// bundle. The OS store is never consulted, so a rotated server issuer means
// the bundle has to be refreshed before any call succeeds again.

use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use tracing::debug;

use crate::error::Error;

/// The pinned certificate set used to validate the server.
///
/// Built once at startup and never mutated. Always holds at least one
/// certificate: construction fails on an empty bundle instead of handing
/// back an anchor that would silently trust nothing (or everything).
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    certificates: Vec<CertificateDer<'static>>,
    roots: Arc<RootCertStore>,
}

impl TrustAnchor {
    /// Parse a PEM bundle, keeping only `CERTIFICATE` blocks.
    ///
    /// Other block types (keys, parameters) are skipped. A certificate block
    /// that fails base64 or DER parsing fails the whole bundle.
    pub fn from_pem(bundle: &[u8]) -> Result<Self, Error> {
        let certificates = CertificateDer::pem_slice_iter(bundle)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::MalformedCertificate(e.to_string()))?;

        if certificates.is_empty() {
            return Err(Error::EmptyTrustAnchor);
        }

        let mut roots = RootCertStore::empty();
        for (index, cert) in certificates.iter().enumerate() {
            roots
                .add(cert.clone())
                .map_err(|e| Error::MalformedCertificate(format!("certificate #{index}: {e}")))?;
        }

        debug!(certificates = certificates.len(), "trust anchor built");

        Ok(Self {
            certificates,
            roots: Arc::new(roots),
        })
    }

    /// Read and parse a PEM bundle from disk.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let bundle = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::TrustAnchorMissing {
                path: path.to_path_buf(),
            },
            _ => Error::Tls(format!("failed to read trust bundle {}: {e}", path.display())),
        })?;
        Self::from_pem(&bundle)
    }

    /// DER certificates in bundle order.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always `false` for a constructed anchor; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Build a TLS client configuration whose only roots are this bundle.
    pub fn client_config(&self) -> Result<rustls::ClientConfig, Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?
            .with_root_certificates(Arc::clone(&self.roots))
            .with_no_client_auth();
        Ok(config)
    }
}
