use super::{TransportError, TrustedCertVerifier};
use crate::config::TlsData;

use rustls::{Certificate, ClientConfig, PrivateKey, ServerConfig};
use std::sync::Arc;

/// Only TLS 1.3 is offered or accepted, in either direction
static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

fn certificates(data: &TlsData) -> (Vec<Certificate>, PrivateKey) {
    let certs = data.cert_chain.iter().cloned().map(Certificate).collect();
    (certs, PrivateKey(data.key.clone()))
}

/// TLS settings for the proxy's listening side
pub fn server_config(data: &TlsData) -> Result<Arc<ServerConfig>, TransportError> {
    let verifier = Arc::new(TrustedCertVerifier::new(&data.trusted_certs)?);
    let (certs, key) = certificates(data);

    let config = ServerConfig::builder()
        .with_safe_default_cipher_suites()
        .with_safe_default_kx_groups()
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}

/// TLS settings for a client connecting to the proxy
pub fn client_config(data: &TlsData) -> Result<Arc<ClientConfig>, TransportError> {
    let verifier = Arc::new(TrustedCertVerifier::new(&data.trusted_certs)?);
    let (certs, key) = certificates(data);

    let config = ClientConfig::builder()
        .with_safe_default_cipher_suites()
        .with_safe_default_kx_groups()
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_custom_certificate_verifier(verifier)
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}
