//! Session events: user input and the results of effects.

use swipelabel_core::{Credentials, Image, ReviewScore, Reviewer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // =========================================================================
    // Startup
    // =========================================================================
    /// Snapshot read back from the local cache. Missing or unreadable entries
    /// are `None`.
    Restored {
        email: Option<String>,
        images: Option<Vec<Image>>,
        index: Option<usize>,
    },

    // =========================================================================
    // Reviewer input
    // =========================================================================
    LoginRequested { credentials: Credentials },
    DecisionMade { score: ReviewScore },
    ImageUrlRetryRequested,
    NewSessionRequested,
    LogoutRequested,

    // =========================================================================
    // Effect results
    // =========================================================================
    AuthSucceeded { reviewer: Reviewer },
    AuthFailed { message: String },
    ImagesFetched { images: Vec<Image> },
    FetchFailed { message: String },
    ImageUrlResolved { index: usize, url: String },
    ImageUrlFailed { index: usize, message: String },
    ReviewAccepted,
    /// `duplicate` is set when the server already holds a review for the pair.
    ReviewRejected { message: String, duplicate: bool },
}

impl SessionEvent {
    /// Short description for logs. Never includes credentials or URLs.
    pub fn log_summary(&self) -> String {
        match self {
            SessionEvent::Restored {
                email,
                images,
                index,
            } => format!(
                "Restored(email={}, images={}, index={:?})",
                email.is_some(),
                images.as_ref().map_or(0, |i| i.len()),
                index
            ),
            SessionEvent::LoginRequested { credentials } => {
                format!("LoginRequested({})", credentials.email)
            }
            SessionEvent::DecisionMade { score } => format!("DecisionMade({})", score),
            SessionEvent::ImageUrlRetryRequested => "ImageUrlRetryRequested".to_string(),
            SessionEvent::NewSessionRequested => "NewSessionRequested".to_string(),
            SessionEvent::LogoutRequested => "LogoutRequested".to_string(),
            SessionEvent::AuthSucceeded { reviewer } => {
                format!("AuthSucceeded(batch={})", reviewer.batch_number)
            }
            SessionEvent::AuthFailed { .. } => "AuthFailed".to_string(),
            SessionEvent::ImagesFetched { images } => format!("ImagesFetched({})", images.len()),
            SessionEvent::FetchFailed { .. } => "FetchFailed".to_string(),
            SessionEvent::ImageUrlResolved { index, .. } => format!("ImageUrlResolved({})", index),
            SessionEvent::ImageUrlFailed { index, .. } => format!("ImageUrlFailed({})", index),
            SessionEvent::ReviewAccepted => "ReviewAccepted".to_string(),
            SessionEvent::ReviewRejected { duplicate, .. } => {
                format!("ReviewRejected(duplicate={})", duplicate)
            }
        }
    }
}
