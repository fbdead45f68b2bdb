//! Client session states.

use swipelabel_core::Image;

/// Where a reviewer is in the login / review / completion flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No reviewer signed in. Keeps the last typed email after a failed login.
    Unauthenticated { email: Option<String> },

    /// Credentials sent, waiting for the server.
    Authenticating { email: String },

    /// Signed in, loading the unreviewed queue.
    Fetching { email: String, reviewed: u32 },

    /// Working through the queue.
    Reviewing {
        email: String,
        images: Vec<Image>,
        /// Position of the image on screen. Always `< images.len()`.
        index: usize,
        /// Reviews accepted in this session.
        reviewed: u32,
        /// Download URL for `images[index]`, once resolved.
        image_url: Option<String>,
        /// A submission for `images[index]` is in flight.
        submitting: bool,
    },

    /// Queue exhausted, or loading it failed.
    Complete { email: String, reviewed: u32 },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Unauthenticated { email: None }
    }
}

impl SessionState {
    pub fn email(&self) -> Option<&str> {
        match self {
            SessionState::Unauthenticated { email } => email.as_deref(),
            SessionState::Authenticating { email }
            | SessionState::Fetching { email, .. }
            | SessionState::Reviewing { email, .. }
            | SessionState::Complete { email, .. } => Some(email),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(
            self,
            SessionState::Fetching { .. }
                | SessionState::Reviewing { .. }
                | SessionState::Complete { .. }
        )
    }

    /// Reviews accepted since the session (re)started.
    pub fn reviewed(&self) -> u32 {
        match self {
            SessionState::Fetching { reviewed, .. }
            | SessionState::Reviewing { reviewed, .. }
            | SessionState::Complete { reviewed, .. } => *reviewed,
            _ => 0,
        }
    }

    pub fn current_image(&self) -> Option<&Image> {
        match self {
            SessionState::Reviewing { images, index, .. } => images.get(*index),
            _ => None,
        }
    }

    /// Whether a like/dislike would be accepted right now.
    pub fn accepts_decision(&self) -> bool {
        matches!(
            self,
            SessionState::Reviewing {
                image_url: Some(_),
                submitting: false,
                ..
            }
        )
    }
}
