//! Pure state transition function.
//!
//! Takes the current session state and an event, returns the new state and
//! the effects to execute. No I/O happens here.

use swipelabel_core::Image;

use super::effect::SessionEffect;
use super::event::SessionEvent;
use super::state::SessionState;

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub state: SessionState,
    pub effects: Vec<SessionEffect>,
}

impl TransitionResult {
    pub fn new(state: SessionState, effects: Vec<SessionEffect>) -> Self {
        Self { state, effects }
    }

    pub fn no_change(state: SessionState) -> Self {
        Self {
            state,
            effects: vec![],
        }
    }
}

/// Move past `images[index]`, either to the next image or to completion.
fn advance(email: String, images: Vec<Image>, index: usize, reviewed: u32) -> TransitionResult {
    let next = index + 1;
    match images.get(next).cloned() {
        Some(image) => TransitionResult::new(
            SessionState::Reviewing {
                email,
                images,
                index: next,
                reviewed,
                image_url: None,
                submitting: false,
            },
            vec![
                SessionEffect::CacheIndex { index: next },
                SessionEffect::ResolveImageUrl { index: next, image },
            ],
        ),
        None => TransitionResult::new(
            SessionState::Complete { email, reviewed },
            vec![SessionEffect::ClearSnapshot],
        ),
    }
}

/// True when `state` is showing image `index` and still waits for its URL.
fn awaiting_url(state: &SessionState, for_index: usize) -> bool {
    matches!(
        state,
        SessionState::Reviewing {
            index,
            image_url: None,
            ..
        } if *index == for_index
    )
}

/// Pure state transition function.
pub fn transition(state: SessionState, event: SessionEvent) -> TransitionResult {
    match (state, event) {
        // =====================================================================
        // Startup
        // =====================================================================

        // Cached queue: resume where the reviewer left off
        (
            SessionState::Unauthenticated { .. },
            SessionEvent::Restored {
                email: Some(email),
                images: Some(images),
                index,
            },
        ) => {
            let index = index.unwrap_or(0);
            match images.get(index).cloned() {
                Some(image) => TransitionResult::new(
                    SessionState::Reviewing {
                        email,
                        images,
                        index,
                        reviewed: 0,
                        image_url: None,
                        submitting: false,
                    },
                    vec![SessionEffect::ResolveImageUrl { index, image }],
                ),
                None => TransitionResult::new(
                    SessionState::Complete { email, reviewed: 0 },
                    vec![SessionEffect::ClearSnapshot],
                ),
            }
        }

        // Signed in but nothing cached: load the queue
        (
            SessionState::Unauthenticated { .. },
            SessionEvent::Restored {
                email: Some(email),
                images: None,
                ..
            },
        ) => TransitionResult::new(
            SessionState::Fetching {
                email: email.clone(),
                reviewed: 0,
            },
            vec![SessionEffect::FetchImages { email }],
        ),

        // Leftover queue without an email is unusable
        (
            SessionState::Unauthenticated { .. },
            SessionEvent::Restored {
                email: None,
                images,
                index,
            },
        ) => {
            let effects = if images.is_some() || index.is_some() {
                vec![SessionEffect::ClearSnapshot]
            } else {
                vec![]
            };
            TransitionResult::new(SessionState::Unauthenticated { email: None }, effects)
        }

        // =====================================================================
        // Login
        // =====================================================================
        (SessionState::Unauthenticated { .. }, SessionEvent::LoginRequested { credentials }) => {
            TransitionResult::new(
                SessionState::Authenticating {
                    email: credentials.email.clone(),
                },
                vec![
                    SessionEffect::ClearError,
                    SessionEffect::Authenticate { credentials },
                ],
            )
        }

        (SessionState::Authenticating { .. }, SessionEvent::AuthSucceeded { reviewer }) => {
            let email = reviewer.email;
            TransitionResult::new(
                SessionState::Fetching {
                    email: email.clone(),
                    reviewed: 0,
                },
                vec![
                    SessionEffect::CacheEmail {
                        email: email.clone(),
                    },
                    SessionEffect::FetchImages { email },
                ],
            )
        }

        (SessionState::Authenticating { email }, SessionEvent::AuthFailed { message }) => {
            TransitionResult::new(
                SessionState::Unauthenticated { email: Some(email) },
                vec![SessionEffect::ShowError { message }],
            )
        }

        // =====================================================================
        // Queue loading
        // =====================================================================
        (SessionState::Fetching { email, reviewed }, SessionEvent::ImagesFetched { images }) => {
            match images.first().cloned() {
                Some(first) => TransitionResult::new(
                    SessionState::Reviewing {
                        email,
                        images: images.clone(),
                        index: 0,
                        reviewed,
                        image_url: None,
                        submitting: false,
                    },
                    vec![
                        SessionEffect::CacheImages { images },
                        SessionEffect::CacheIndex { index: 0 },
                        SessionEffect::ResolveImageUrl {
                            index: 0,
                            image: first,
                        },
                    ],
                ),
                None => TransitionResult::new(
                    SessionState::Complete { email, reviewed },
                    vec![SessionEffect::ClearSnapshot],
                ),
            }
        }

        (SessionState::Fetching { email, reviewed }, SessionEvent::FetchFailed { message }) => {
            TransitionResult::new(
                SessionState::Complete { email, reviewed },
                vec![SessionEffect::ShowError { message }],
            )
        }

        // =====================================================================
        // Image URLs
        // =====================================================================
        (state, SessionEvent::ImageUrlResolved { index, url }) if awaiting_url(&state, index) => {
            match state {
                SessionState::Reviewing {
                    email,
                    images,
                    index,
                    reviewed,
                    submitting,
                    ..
                } => TransitionResult::no_change(SessionState::Reviewing {
                    email,
                    images,
                    index,
                    reviewed,
                    image_url: Some(url),
                    submitting,
                }),
                other => TransitionResult::no_change(other),
            }
        }

        (state, SessionEvent::ImageUrlFailed { index, message })
            if awaiting_url(&state, index) =>
        {
            TransitionResult::new(state, vec![SessionEffect::ShowError { message }])
        }

        (
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                image_url: None,
                submitting: false,
            },
            SessionEvent::ImageUrlRetryRequested,
        ) => {
            let effects = match images.get(index) {
                Some(image) => vec![
                    SessionEffect::ClearError,
                    SessionEffect::ResolveImageUrl {
                        index,
                        image: image.clone(),
                    },
                ],
                None => vec![],
            };
            TransitionResult::new(
                SessionState::Reviewing {
                    email,
                    images,
                    index,
                    reviewed,
                    image_url: None,
                    submitting: false,
                },
                effects,
            )
        }

        // =====================================================================
        // Decisions
        // =====================================================================
        (
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                image_url: Some(url),
                submitting: false,
            },
            SessionEvent::DecisionMade { score },
        ) => {
            let Some(image) = images.get(index).cloned() else {
                return TransitionResult::no_change(SessionState::Reviewing {
                    email,
                    images,
                    index,
                    reviewed,
                    image_url: Some(url),
                    submitting: false,
                });
            };
            let effects = vec![
                SessionEffect::ClearError,
                SessionEffect::SubmitReview {
                    alle_ingestion_id: image.alle_ingestion_id,
                    review_score: score,
                    reviewer_email: email.clone(),
                },
            ];
            TransitionResult::new(
                SessionState::Reviewing {
                    email,
                    images,
                    index,
                    reviewed,
                    image_url: Some(url),
                    submitting: true,
                },
                effects,
            )
        }

        (
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                submitting: true,
                ..
            },
            SessionEvent::ReviewAccepted,
        ) => advance(email, images, index, reviewed + 1),

        // Already recorded server-side: move on without counting it. Staying on the
        // image would only invite resubmitting a pair the store will always refuse.
        (
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                submitting: true,
                ..
            },
            SessionEvent::ReviewRejected {
                message,
                duplicate: true,
            },
        ) => {
            let mut result = advance(email, images, index, reviewed);
            result
                .effects
                .insert(0, SessionEffect::ShowError { message });
            result
        }

        // Stay on the image so the reviewer can decide again
        (
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                image_url,
                submitting: true,
            },
            SessionEvent::ReviewRejected {
                message,
                duplicate: false,
            },
        ) => TransitionResult::new(
            SessionState::Reviewing {
                email,
                images,
                index,
                reviewed,
                image_url,
                submitting: false,
            },
            vec![SessionEffect::ShowError { message }],
        ),

        // =====================================================================
        // Session control
        // =====================================================================
        (SessionState::Complete { email, .. }, SessionEvent::NewSessionRequested)
        | (
            SessionState::Reviewing {
                email,
                submitting: false,
                ..
            },
            SessionEvent::NewSessionRequested,
        ) => TransitionResult::new(
            SessionState::Fetching {
                email: email.clone(),
                reviewed: 0,
            },
            vec![
                SessionEffect::ClearSnapshot,
                SessionEffect::ClearError,
                SessionEffect::FetchImages { email },
            ],
        ),

        (_, SessionEvent::LogoutRequested) => TransitionResult::new(
            SessionState::Unauthenticated { email: None },
            vec![SessionEffect::ClearAll, SessionEffect::ClearError],
        ),

        // Everything else (late results, input in the wrong state) is ignored
        (state, _) => TransitionResult::no_change(state),
    }
}
