//! TLS client configuration and the certificate acceptance policy.
//!
//! Certificate evaluation is split in two: the webpki verifier decides
//! whether the presented chain is trusted, then a [`CertificatePolicy`]
//! gets the final say for each certificate. Policies see the chain root
//! first, with depth 0 being the server's own certificate.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;

use crate::error::{FetchError, Result};

/// Per-certificate acceptance decision, consulted after chain verification.
///
/// `preverified` tells the policy whether the chain as a whole passed
/// verification against the configured roots. Returning `false` from any
/// call rejects the handshake.
pub trait CertificatePolicy: Send + Sync {
    fn accept(
        &self,
        preverified: bool,
        server: &ServerName<'_>,
        depth: usize,
        cert: &CertificateDer<'_>,
    ) -> bool;
}

/// Default policy: stand by the verifier's decision.
pub struct StrictPolicy;

impl CertificatePolicy for StrictPolicy {
    fn accept(
        &self,
        preverified: bool,
        _server: &ServerName<'_>,
        _depth: usize,
        _cert: &CertificateDer<'_>,
    ) -> bool {
        preverified
    }
}

/// Accepts every certificate regardless of verification outcome. Only
/// suitable for testing against endpoints with self-signed certificates.
pub struct InsecurePolicy;

impl CertificatePolicy for InsecurePolicy {
    fn accept(
        &self,
        _preverified: bool,
        server: &ServerName<'_>,
        depth: usize,
        cert: &CertificateDer<'_>,
    ) -> bool {
        tracing::warn!(
            "Accepting certificate for {} at depth {} without verification ({} bytes)",
            server.to_str(),
            depth,
            cert.len()
        );
        true
    }
}

/// Certificate verifier that runs webpki verification and then hands the
/// outcome to a [`CertificatePolicy`] for the final decision.
struct PolicyVerifier {
    inner: Arc<WebPkiServerVerifier>,
    policy: Arc<dyn CertificatePolicy>,
}

impl std::fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyVerifier").finish()
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        );
        let preverified = verified.is_ok();

        let chain: Vec<&CertificateDer<'_>> =
            std::iter::once(end_entity).chain(intermediates.iter()).collect();
        tracing::debug!(
            "Evaluating {} certificate(s) for {} (preverified: {})",
            chain.len(),
            server_name.to_str(),
            preverified
        );

        for depth in (0..chain.len()).rev() {
            if !self.policy.accept(preverified, server_name, depth, chain[depth]) {
                return match verified {
                    Err(e) => Err(e),
                    Ok(_) => Err(rustls::Error::InvalidCertificate(
                        CertificateError::ApplicationVerificationFailure,
                    )),
                };
            }
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Build a TLS connector trusting the bundled webpki roots, with `policy`
/// deciding certificate acceptance.
pub fn create_connector(policy: Arc<dyn CertificatePolicy>) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    create_connector_with_roots(roots, policy)
}

/// Build a TLS connector trusting exactly the given roots.
pub fn create_connector_with_roots(
    roots: RootCertStore,
    policy: Arc<dyn CertificatePolicy>,
) -> Result<TlsConnector> {
    let inner = WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| FetchError::TlsConfig(format!("Failed to build certificate verifier: {}", e)))?;

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(PolicyVerifier { inner, policy }))
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_inputs() -> (ServerName<'static>, CertificateDer<'static>) {
        let server = ServerName::try_from("example.com").unwrap();
        let cert = CertificateDer::from(vec![0u8; 16]);
        (server, cert)
    }

    #[test]
    fn test_strict_policy_follows_verifier() {
        let (server, cert) = test_inputs();
        assert!(StrictPolicy.accept(true, &server, 0, &cert));
        assert!(!StrictPolicy.accept(false, &server, 0, &cert));
    }

    #[test]
    fn test_insecure_policy_accepts_unverified() {
        let (server, cert) = test_inputs();
        assert!(InsecurePolicy.accept(false, &server, 1, &cert));
    }

    #[test]
    fn test_create_connector() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        create_connector(Arc::new(StrictPolicy)).unwrap();
    }
}
