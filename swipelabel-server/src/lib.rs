pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod repository;
pub mod signer;

pub use controller::{ReviewController, Timeouts};
pub use error::ApiError;
pub use repository::{InMemoryRepository, ReviewRepository, SqliteRepository};
pub use signer::{S3UrlSigner, UrlSigner};

/// Shared state handed to every request handler.
pub struct AppState {
    pub controller: ReviewController,
}

impl AppState {
    pub fn new(controller: ReviewController) -> Self {
        Self { controller }
    }
}
