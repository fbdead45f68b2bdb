//! Out-of-band provisioning data for reviewers and images.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use swipelabel_core::Image;

/// A reviewer row as stored, including the comparison credential.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewerAccount {
    pub email: String,
    pub password: String,
    pub batch_number: i64,
}

impl fmt::Debug for ReviewerAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewerAccount")
            .field("email", &self.email)
            .field("password", &"****")
            .field("batch_number", &self.batch_number)
            .finish()
    }
}

/// Reviewers and images to load into a repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub reviewers: Vec<ReviewerAccount>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl CatalogImport {
    /// Read a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog file {}", path.display()))
    }
}
