//! Effects (side effects as data).
//!
//! The driver executes them against the review API and the local cache.

use swipelabel_core::{Credentials, Image, ReviewScore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    // =========================================================================
    // Review API
    // =========================================================================
    Authenticate { credentials: Credentials },
    FetchImages { email: String },
    /// Ask for a download URL for the image at `index`.
    ResolveImageUrl { index: usize, image: Image },
    SubmitReview {
        alle_ingestion_id: String,
        review_score: ReviewScore,
        reviewer_email: String,
    },

    // =========================================================================
    // Local cache
    // =========================================================================
    CacheEmail { email: String },
    CacheImages { images: Vec<Image> },
    CacheIndex { index: usize },
    /// Forget cached images and position, keeping the email.
    ClearSnapshot,
    /// Forget everything, including the email.
    ClearAll,

    // =========================================================================
    // Banner
    // =========================================================================
    ShowError { message: String },
    ClearError,
}
