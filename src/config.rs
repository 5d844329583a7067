use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::logging::LogFormat;
use crate::upload::UploadPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime settings, read from `INGEST_*` environment variables (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub delivery_url: Option<String>,
    pub upload: UploadPolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("INGEST_DB_PATH").unwrap_or_else(|| "transactions.db".into());

        let listen_addr = lookup("INGEST_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e: std::net::AddrParseError| ConfigError {
            key: "INGEST_LISTEN_ADDR",
            value: listen_addr.clone(),
            reason: e.to_string(),
        })?;

        let delivery_url = lookup("INGEST_DELIVERY_URL").filter(|s| !s.trim().is_empty());

        let mut upload = UploadPolicy::default();
        if let Some(raw) = lookup("INGEST_MAX_UPLOAD_BYTES") {
            upload.max_bytes = raw.trim().parse::<usize>().map_err(|e: std::num::ParseIntError| ConfigError {
                key: "INGEST_MAX_UPLOAD_BYTES",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(raw) = lookup("INGEST_ALLOWED_EXTENSIONS") {
            upload.allowed_extensions = UploadPolicy::parse_extensions(&raw);
            if upload.allowed_extensions.is_empty() {
                return Err(ConfigError {
                    key: "INGEST_ALLOWED_EXTENSIONS",
                    value: raw,
                    reason: "no extensions listed".to_string(),
                });
            }
        }

        let log_format = match lookup("INGEST_LOG_FORMAT") {
            None => LogFormat::Text,
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| ConfigError {
                key: "INGEST_LOG_FORMAT",
                value: raw.clone(),
                reason,
            })?,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            listen_addr,
            delivery_url,
            upload,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();

        assert_eq!(c.db_path, PathBuf::from("transactions.db"));
        assert_eq!(c.listen_addr.port(), 3000);
        assert_eq!(c.delivery_url, None);
        assert_eq!(c.upload.max_bytes, 5 * 1024 * 1024);
        assert_eq!(c.upload.allowed_extensions, vec![".xlsx", ".csv"]);
        assert_eq!(c.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("INGEST_DB_PATH", "/tmp/x.db"),
            ("INGEST_LISTEN_ADDR", "127.0.0.1:8088"),
            ("INGEST_DELIVERY_URL", "http://localhost:8080/api/transactions"),
            ("INGEST_MAX_UPLOAD_BYTES", "1024"),
            ("INGEST_ALLOWED_EXTENSIONS", "csv, .XLSX"),
            ("INGEST_LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(c.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(c.listen_addr.port(), 8088);
        assert_eq!(c.delivery_url.as_deref(), Some("http://localhost:8080/api/transactions"));
        assert_eq!(c.upload.max_bytes, 1024);
        assert_eq!(c.upload.allowed_extensions, vec![".csv", ".xlsx"]);
        assert_eq!(c.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = config(&[("INGEST_LISTEN_ADDR", "not-an-addr")]).unwrap_err();
        assert_eq!(err.key, "INGEST_LISTEN_ADDR");

        let err = config(&[("INGEST_MAX_UPLOAD_BYTES", "5MB")]).unwrap_err();
        assert_eq!(err.key, "INGEST_MAX_UPLOAD_BYTES");

        let err = config(&[("INGEST_LOG_FORMAT", "xml")]).unwrap_err();
        assert_eq!(err.key, "INGEST_LOG_FORMAT");

        let err = config(&[("INGEST_ALLOWED_EXTENSIONS", " , ")]).unwrap_err();
        assert_eq!(err.key, "INGEST_ALLOWED_EXTENSIONS");
    }
}
