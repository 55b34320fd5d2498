//! rustls integration: custom server certificate verifier and client
//! config construction from a PEM trust bundle.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore,
    SignatureScheme,
};
use tracing::{debug, warn};

use crate::identity::verify_peer;
use crate::x509::X509Peer;

/// Errors from TLS context setup.
///
/// Configuration problems are surfaced as values and propagated to the
/// connect-failure path; nothing in setup panics or unwinds.
#[derive(Debug, thiserror::Error)]
pub enum TlsSetupError {
    #[error("failed to read trust bundle {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM in trust bundle {path}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("trust bundle {path} contains no certificates")]
    EmptyBundle { path: PathBuf },

    #[error("rejected trust anchor: {0}")]
    BadAnchor(#[from] rustls::Error),

    #[error("failed to build chain verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),
}

/// Server certificate verifier layering an explicit hostname identity
/// check on top of the ordinary webpki chain validation.
///
/// The chain check runs first and is never overridden; on success the
/// end-entity certificate's SAN/CN fields are compared against the dialed
/// server name by [`verify_peer`]. A mismatch aborts the handshake with
/// [`CertificateError::NotValidForName`].
#[derive(Debug)]
pub struct IdentityVerifier {
    chain: Arc<WebPkiServerVerifier>,
}

impl IdentityVerifier {
    pub fn new(chain: Arc<WebPkiServerVerifier>) -> Self {
        Self { chain }
    }
}

impl ServerCertVerifier for IdentityVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        // Cryptographic chain validation first; a failure here is final.
        // webpki couples a SAN-only name check into the same call, and that
        // check is exactly what this verifier overrides (CN fallback,
        // embedded-NUL policy), so a pure name mismatch is remapped to
        // "chain valid" and the identity decision below becomes ours.
        match self
            .chain
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Ok(_) => {}
            Err(TlsError::InvalidCertificate(
                CertificateError::NotValidForName
                | CertificateError::NotValidForNameContext { .. },
            )) => {}
            Err(e) => return Err(e),
        }

        let hostname = match server_name {
            ServerName::DnsName(dns) => dns.as_ref().to_owned(),
            ServerName::IpAddress(ip) => std::net::IpAddr::from(*ip).to_string(),
            _ => {
                warn!("unsupported server name type, rejecting");
                return Err(TlsError::InvalidCertificate(
                    CertificateError::NotValidForName,
                ));
            }
        };

        let Some(peer) = X509Peer::parse(end_entity.as_ref()) else {
            return Err(TlsError::InvalidCertificate(CertificateError::BadEncoding));
        };

        // The chain verdict is in hand and this is the leaf (depth 0).
        if verify_peer(&hostname, true, 0, &peer) {
            debug!(host = %hostname, "peer identity verified");
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(host = %hostname, "certificate does not name the dialed host");
            Err(TlsError::InvalidCertificate(
                CertificateError::NotValidForName,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.chain.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.chain.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.chain.supported_verify_schemes()
    }
}

/// Builds a rustls client config from a PEM root certificate bundle,
/// with [`IdentityVerifier`] installed as the certificate verifier.
pub fn build_tls_config(trust_bundle: &Path) -> Result<Arc<ClientConfig>, TlsSetupError> {
    let file = File::open(trust_bundle).map_err(|source| TlsSetupError::Read {
        path: trust_bundle.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let mut roots = RootCertStore::empty();
    let mut loaded = 0usize;
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|source| TlsSetupError::Pem {
            path: trust_bundle.to_path_buf(),
            source,
        })?;
        roots.add(cert)?;
        loaded += 1;
    }
    if loaded == 0 {
        return Err(TlsSetupError::EmptyBundle {
            path: trust_bundle.to_path_buf(),
        });
    }
    debug!(count = loaded, path = %trust_bundle.display(), "loaded trust anchors");

    let chain = WebPkiServerVerifier::builder(Arc::new(roots)).build()?;

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(IdentityVerifier::new(chain)))
        .with_no_client_auth();

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn self_signed(san: Vec<String>) -> rcgen::Certificate {
        let params = rcgen::CertificateParams::new(san).unwrap();
        let key = rcgen::KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap()
    }

    fn write_bundle(pem: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_bundle_is_a_read_error() {
        let err = build_tls_config(Path::new("/nonexistent/server.pem")).unwrap_err();
        assert!(matches!(err, TlsSetupError::Read { .. }));
    }

    #[test]
    fn empty_bundle_is_rejected() {
        let file = write_bundle("");
        let err = build_tls_config(file.path()).unwrap_err();
        assert!(matches!(err, TlsSetupError::EmptyBundle { .. }));
    }

    #[test]
    fn non_certificate_content_is_rejected() {
        let file = write_bundle("just some text, no PEM blocks\n");
        let err = build_tls_config(file.path()).unwrap_err();
        assert!(matches!(err, TlsSetupError::EmptyBundle { .. }));
    }

    #[test]
    fn valid_bundle_builds_a_config() {
        let cert = self_signed(vec!["api.example.com".into()]);
        let file = write_bundle(&cert.pem());
        let config = build_tls_config(file.path()).unwrap();
        assert!(Arc::strong_count(&config) >= 1);
    }

    #[test]
    fn verifier_accepts_matching_san_and_rejects_other_hosts() {
        let cert = self_signed(vec!["api.example.com".into()]);
        let der = cert.der().clone();

        let mut roots = RootCertStore::empty();
        roots.add(der.clone()).unwrap();
        let chain = WebPkiServerVerifier::builder(Arc::new(roots)).build().unwrap();
        let verifier = IdentityVerifier::new(chain);

        let ok_name = ServerName::try_from("api.example.com").unwrap();
        let result = verifier.verify_server_cert(&der, &[], &ok_name, &[], UnixTime::now());
        assert!(result.is_ok(), "expected trust: {result:?}");

        // Case differs only in casing: still a match.
        let cased = ServerName::try_from("API.Example.com").unwrap();
        assert!(
            verifier
                .verify_server_cert(&der, &[], &cased, &[], UnixTime::now())
                .is_ok()
        );

        let wrong = ServerName::try_from("other.example.com").unwrap();
        let err = verifier
            .verify_server_cert(&der, &[], &wrong, &[], UnixTime::now())
            .unwrap_err();
        assert!(matches!(
            err,
            TlsError::InvalidCertificate(
                CertificateError::NotValidForName
                    | CertificateError::NotValidForNameContext { .. }
            )
        ));
    }

    #[test]
    fn verifier_falls_back_to_common_name() {
        // No SAN extension at all: webpki alone would reject this
        // certificate for any name, the CN fallback accepts it.
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = rcgen::DistinguishedName::new();
        dn.push(rcgen::DnType::CommonName, "api.example.com");
        params.distinguished_name = dn;
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        let der = cert.der().clone();

        let mut roots = RootCertStore::empty();
        roots.add(der.clone()).unwrap();
        let chain = WebPkiServerVerifier::builder(Arc::new(roots)).build().unwrap();
        let verifier = IdentityVerifier::new(chain);

        let name = ServerName::try_from("api.example.com").unwrap();
        assert!(
            verifier
                .verify_server_cert(&der, &[], &name, &[], UnixTime::now())
                .is_ok()
        );
    }
}
