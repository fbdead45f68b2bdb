use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::controller::Timeouts;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    pub aws_region: String,
    pub aws_access_key: String,
    pub aws_secret_key: String,
    pub s3_bucket: String,
    pub timeouts: Timeouts,
    /// JSON catalog of reviewers and images to load at startup, if any.
    pub catalog_import_path: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("state_dir", &self.state_dir)
            .field("aws_region", &self.aws_region)
            .field("aws_access_key", &"****")
            .field("aws_secret_key", &"****")
            .field("s3_bucket", &self.s3_bucket)
            .field("timeouts", &self.timeouts)
            .field("catalog_import_path", &self.catalog_import_path)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let aws_region = var("AWS_REGION").unwrap_or_else(|| "ap-south-1".to_string());

        let aws_access_key =
            var("AWS_ACCESS_KEY").context("AWS_ACCESS_KEY environment variable is required")?;

        let aws_secret_key =
            var("AWS_SECRET_KEY").context("AWS_SECRET_KEY environment variable is required")?;

        let s3_bucket = var("S3_BUCKET").context("S3_BUCKET environment variable is required")?;

        let store_timeout = var("STORE_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .context("STORE_TIMEOUT_SECS must be a valid number of seconds")?;

        let signer_timeout = var("SIGNER_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .context("SIGNER_TIMEOUT_SECS must be a valid number of seconds")?;

        let catalog_import_path = var("CATALOG_IMPORT_PATH").map(PathBuf::from);

        Ok(Config {
            port,
            state_dir,
            aws_region,
            aws_access_key,
            aws_secret_key,
            s3_bucket,
            timeouts: Timeouts {
                store: Duration::from_secs(store_timeout),
                signer: Duration::from_secs(signer_timeout),
            },
            catalog_import_path,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("swipelabel.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("AWS_ACCESS_KEY", "AKIDEXAMPLE"),
        ("AWS_SECRET_KEY", "secret"),
        ("S3_BUCKET", "review-images"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.state_dir, PathBuf::from("."));
        assert_eq!(config.aws_region, "ap-south-1");
        assert_eq!(config.timeouts, Timeouts::default());
        assert!(config.catalog_import_path.is_none());
        assert_eq!(config.database_path(), PathBuf::from("./swipelabel.db"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("STATE_DIR", "/var/lib/swipelabel"),
            ("AWS_REGION", "eu-west-1"),
            ("STORE_TIMEOUT_SECS", "3"),
            ("SIGNER_TIMEOUT_SECS", "5"),
            ("CATALOG_IMPORT_PATH", "/etc/swipelabel/catalog.json"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/swipelabel/swipelabel.db")
        );
        assert_eq!(config.aws_region, "eu-west-1");
        assert_eq!(config.timeouts.store, Duration::from_secs(3));
        assert_eq!(config.timeouts.signer, Duration::from_secs(5));
        assert_eq!(
            config.catalog_import_path,
            Some(PathBuf::from("/etc/swipelabel/catalog.json"))
        );
    }

    #[test]
    fn test_missing_bucket_is_an_error() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "S3_BUCKET")
            .collect();
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("secret\""));
    }
}
