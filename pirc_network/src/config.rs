use serde::Deserialize;
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing_core::LevelFilter;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {1}: {0}")]
    IoError(std::io::Error, PathBuf),
    #[error("Parse error in {1}: {0}")]
    ParseError(json5::Error, PathBuf),
    #[error("{1}: {0}")]
    FormatError(String, PathBuf),
}

/// Load a JSON5 configuration file into the given type
pub fn load_config<T, P>(filename: P) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = filename.as_ref();
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| ConfigError::IoError(e, path.to_owned()))?;

    json5::from_str(&contents).map_err(|e| ConfigError::ParseError(e, path.to_owned()))
}

/// Certificate, key and trust store locations for one end of a connection
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    /// If absent, the private key is read from `cert_file`
    pub key_file: Option<PathBuf>,
    /// PEM certificates of the peers we accept
    pub trusted_certs_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TlsData {
    pub key: Vec<u8>,
    pub cert_chain: Vec<Vec<u8>>,
    pub trusted_certs: Vec<Vec<u8>>,
}

fn read_certs(path: &Path) -> Result<Vec<Vec<u8>>, ConfigError> {
    let file = File::open(path).map_err(|e| ConfigError::IoError(e, path.to_owned()))?;
    let mut reader = BufReader::new(file);
    let certs =
        rustls_pemfile::certs(&mut reader).map_err(|e| ConfigError::IoError(e, path.to_owned()))?;

    if certs.is_empty() {
        return Err(ConfigError::FormatError(
            "No certificates in file".to_string(),
            path.to_owned(),
        ));
    }
    Ok(certs)
}

fn read_key(path: &Path) -> Result<Vec<u8>, ConfigError> {
    use rustls_pemfile::Item;

    let file = File::open(path).map_err(|e| ConfigError::IoError(e, path.to_owned()))?;
    let mut reader = BufReader::new(file);

    // The key may share a file with certificates, so skip past anything else
    loop {
        match rustls_pemfile::read_one(&mut reader)
            .map_err(|e| ConfigError::IoError(e, path.to_owned()))?
        {
            Some(Item::RSAKey(key)) | Some(Item::PKCS8Key(key)) => return Ok(key),
            Some(_) => continue,
            None => {
                return Err(ConfigError::FormatError(
                    "No private key in file".to_string(),
                    path.to_owned(),
                ))
            }
        }
    }
}

impl TlsConfig {
    pub fn load_from_disk(&self) -> Result<TlsData, ConfigError> {
        let cert_chain = read_certs(&self.cert_file)?;
        let key = read_key(self.key_file.as_ref().unwrap_or(&self.cert_file))?;
        let trusted_certs = read_certs(&self.trusted_certs_file)?;

        Ok(TlsData {
            key,
            cert_chain,
            trusted_certs,
        })
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinLogTarget {
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LogTarget {
    File { filename: PathBuf },
    Builtin(BuiltinLogTarget),
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LogEntry {
    pub target: LogTarget,
    #[serde(default)]
    pub modules: Vec<String>,
    pub level: Option<LogLevel>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_dir")]
    pub dir: PathBuf,
    pub default_level: Option<LogLevel>,
    #[serde(default)]
    pub module_levels: HashMap<String, LogLevel>,
    pub targets: Vec<LogEntry>,
}

impl LoggingConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("log")
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(arg: LogLevel) -> LevelFilter {
        match arg {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data_path(name: &str) -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "tests", "data", "certs", name]
            .iter()
            .collect()
    }

    #[test]
    fn load_separate_key() {
        let conf = TlsConfig {
            cert_file: data_path("proxy.pem"),
            key_file: Some(data_path("proxy.key")),
            trusted_certs_file: data_path("trusted.pem"),
        };
        let data = conf.load_from_disk().unwrap();
        assert_eq!(data.cert_chain.len(), 1);
        assert_eq!(data.trusted_certs.len(), 2);
        assert!(!data.key.is_empty());
    }

    #[test]
    fn load_bundled_key() {
        let conf = TlsConfig {
            cert_file: data_path("proxy_bundle.pem"),
            key_file: None,
            trusted_certs_file: data_path("trusted.pem"),
        };
        let data = conf.load_from_disk().unwrap();
        assert_eq!(data.cert_chain.len(), 1);
        assert!(!data.key.is_empty());
    }

    #[test]
    fn missing_files_are_errors() {
        let conf = TlsConfig {
            cert_file: data_path("proxy.pem"),
            key_file: None,
            trusted_certs_file: data_path("trusted.pem"),
        };
        assert!(matches!(conf.load_from_disk(), Err(ConfigError::FormatError(..))));

        let conf = TlsConfig {
            cert_file: data_path("does-not-exist.pem"),
            key_file: None,
            trusted_certs_file: data_path("trusted.pem"),
        };
        assert!(matches!(conf.load_from_disk(), Err(ConfigError::IoError(..))));
    }

    #[test]
    fn parse_logging_section() {
        let conf: LoggingConfig = json5::from_str(
            r#"{
                "default-level": "debug",
                "module-levels": { "rustls": "warn" },
                targets: [
                    { target: "stderr", level: "info" },
                    { target: { filename: "proxy.log" }, modules: ["pirc_proxy"] },
                ],
            }"#,
        )
        .unwrap();

        assert_eq!(conf.dir, PathBuf::from("log"));
        assert_eq!(conf.targets.len(), 2);
        assert!(matches!(conf.targets[1].target, LogTarget::File { .. }));
    }
}
