use super::TransportError;

use rustls::{
    client::{ServerCertVerified, ServerCertVerifier},
    server::{ClientCertVerified, ClientCertVerifier},
    Certificate, DistinguishedNames, ServerName,
};
use sha1::{Digest, Sha1};
use std::time::SystemTime;
use x509_parser::prelude::*;

/// Hex-encoded SHA-1 digest of a DER certificate
pub fn fingerprint(der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(der);
    hex::encode(hasher.finalize())
}

/// Accepts a peer only if its end-entity certificate is one of a fixed set.
///
/// Self-signed certificates are fine; what matters is that the exact
/// certificate was placed in the trust store. Chains presented by the peer
/// are ignored. Used on both sides of the connection.
#[derive(Debug)]
pub struct TrustedCertVerifier {
    fingerprints: Vec<String>,
    subjects: DistinguishedNames,
}

impl TrustedCertVerifier {
    pub fn new(trusted_certs: &[Vec<u8>]) -> Result<Self, TransportError> {
        let mut fingerprints = Vec::new();
        let mut subjects = Vec::new();

        for der in trusted_certs {
            let (_, cert) = X509Certificate::from_der(der)
                .map_err(|e| TransportError::InvalidCertificate(e.to_string()))?;

            subjects.push(rustls::internal::msgs::base::PayloadU16::new(
                cert.subject().as_raw().to_vec(),
            ));
            fingerprints.push(fingerprint(der));
        }

        Ok(Self {
            fingerprints,
            subjects,
        })
    }

    fn check(&self, end_entity: &Certificate) -> Result<(), rustls::Error> {
        let (_, cert) = X509Certificate::from_der(&end_entity.0)
            .map_err(|_| rustls::Error::InvalidCertificateEncoding)?;

        let presented = fingerprint(&end_entity.0);
        if !self.fingerprints.contains(&presented) {
            tracing::warn!(fingerprint = %presented, subject = %cert.subject(), "Rejecting untrusted peer certificate");
            return Err(rustls::Error::InvalidCertificateData(format!(
                "certificate {} is not trusted",
                presented
            )));
        }

        if !cert.validity().is_valid() {
            tracing::warn!(fingerprint = %presented, "Rejecting peer certificate outside its validity period");
            return Err(rustls::Error::InvalidCertificateData(
                "certificate is expired or not yet valid".to_string(),
            ));
        }

        Ok(())
    }
}

impl ClientCertVerifier for TrustedCertVerifier {
    fn client_auth_root_subjects(&self) -> Option<DistinguishedNames> {
        Some(self.subjects.clone())
    }

    fn client_auth_mandatory(&self) -> Option<bool> {
        Some(true)
    }

    fn verify_client_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _now: SystemTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        self.check(end_entity)?;
        Ok(ClientCertVerified::assertion())
    }
}

impl ServerCertVerifier for TrustedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.check(end_entity)?;
        Ok(ServerCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use std::path::PathBuf;

    fn load(cert: &str) -> crate::config::TlsData {
        let dir: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", "certs"]
            .iter()
            .collect();
        TlsConfig {
            cert_file: dir.join(format!("{}.pem", cert)),
            key_file: Some(dir.join(format!("{}.key", cert))),
            trusted_certs_file: dir.join("trusted.pem"),
        }
        .load_from_disk()
        .unwrap()
    }

    #[test]
    fn accepts_only_trusted() {
        let proxy = load("proxy");
        let verifier = TrustedCertVerifier::new(&proxy.trusted_certs).unwrap();

        let client = load("client");
        assert!(verifier.check(&Certificate(client.cert_chain[0].clone())).is_ok());

        let stranger = load("stranger");
        assert!(verifier.check(&Certificate(stranger.cert_chain[0].clone())).is_err());

        assert!(matches!(
            verifier.check(&Certificate(vec![1, 2, 3])),
            Err(rustls::Error::InvalidCertificateEncoding)
        ));
    }

    #[test]
    fn fingerprint_is_hex_sha1() {
        let fp = fingerprint(b"");
        assert_eq!(fp, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }
}
