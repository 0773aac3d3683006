#![allow(dead_code)]

use pirc_network::config::{TlsConfig, TlsData};
use std::path::PathBuf;

pub fn cert_dir() -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "tests", "data", "certs"]
        .iter()
        .collect()
}

/// Load the named identity from the test certificates, trusting the given file
pub fn tls_data(identity: &str, trusted: &str) -> TlsData {
    let dir = cert_dir();
    TlsConfig {
        cert_file: dir.join(format!("{}.pem", identity)),
        key_file: Some(dir.join(format!("{}.key", identity))),
        trusted_certs_file: dir.join(trusted),
    }
    .load_from_disk()
    .expect("failed to load test certificates")
}
