//! Session driver: runs the state machine against the API and the cache.
//!
//! Effects of a transition are executed in order; the events they produce are
//! queued and processed after the effects of the current transition finish.

use std::collections::VecDeque;

use swipelabel_core::SubmitReviewRequest;
use tracing::{debug, info, warn};

use crate::cache::{SessionCache, SessionSnapshot, EMAIL_KEY, IMAGES_KEY, INDEX_KEY};
use crate::client::ReviewApi;
use crate::session::{transition, SessionEffect, SessionEvent, SessionState, TransitionResult};

pub struct SessionDriver<A: ReviewApi, C: SessionCache> {
    api: A,
    cache: C,
    state: SessionState,
    banner: Option<String>,
}

impl<A: ReviewApi, C: SessionCache> SessionDriver<A, C> {
    pub fn new(api: A, cache: C) -> Self {
        Self {
            api,
            cache,
            state: SessionState::default(),
            banner: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Error message currently shown to the reviewer, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Resume from whatever the cache holds.
    pub async fn restore(&mut self) -> &SessionState {
        let snapshot = SessionSnapshot::load(&self.cache);
        self.dispatch(snapshot.into_event()).await
    }

    /// Process `event` and every event its effects produce.
    pub async fn dispatch(&mut self, event: SessionEvent) -> &SessionState {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            debug!("Processing {} in {:?}", event.log_summary(), self.state);

            let current = std::mem::take(&mut self.state);
            let TransitionResult { state, effects } = transition(current, event);
            self.state = state;

            for effect in effects {
                if let Some(result) = self.execute(effect).await {
                    pending.push_back(result);
                }
            }
        }

        &self.state
    }

    async fn execute(&mut self, effect: SessionEffect) -> Option<SessionEvent> {
        match effect {
            SessionEffect::Authenticate { credentials } => {
                Some(match self.api.authenticate(&credentials).await {
                    Ok(reviewer) => {
                        info!(
                            "Signed in as {} (batch {})",
                            reviewer.email, reviewer.batch_number
                        );
                        SessionEvent::AuthSucceeded { reviewer }
                    }
                    Err(e) => SessionEvent::AuthFailed {
                        message: e.to_string(),
                    },
                })
            }

            SessionEffect::FetchImages { email } => {
                Some(match self.api.unreviewed_images(&email).await {
                    Ok(images) => {
                        info!("Fetched {} unreviewed images", images.len());
                        SessionEvent::ImagesFetched { images }
                    }
                    Err(e) => {
                        warn!("Fetching images failed: {}", e);
                        SessionEvent::FetchFailed {
                            message: e.to_string(),
                        }
                    }
                })
            }

            SessionEffect::ResolveImageUrl { index, image } => {
                Some(match self.api.image_url(&image).await {
                    Ok(url) => SessionEvent::ImageUrlResolved { index, url },
                    Err(e) => {
                        warn!("Resolving URL for image {} failed: {}", image.id, e);
                        SessionEvent::ImageUrlFailed {
                            index,
                            message: e.to_string(),
                        }
                    }
                })
            }

            SessionEffect::SubmitReview {
                alle_ingestion_id,
                review_score,
                reviewer_email,
            } => {
                let request =
                    SubmitReviewRequest::new(alle_ingestion_id, review_score, reviewer_email);
                Some(match self.api.submit_review(&request).await {
                    Ok(response) => {
                        debug!("Review stored with id {}", response.result.insert_id);
                        SessionEvent::ReviewAccepted
                    }
                    Err(e) => SessionEvent::ReviewRejected {
                        duplicate: e.is_duplicate_review(),
                        message: e.to_string(),
                    },
                })
            }

            SessionEffect::CacheEmail { email } => {
                self.write(EMAIL_KEY, &email);
                None
            }

            SessionEffect::CacheImages { images } => {
                match serde_json::to_string(&images) {
                    Ok(json) => self.write(IMAGES_KEY, &json),
                    Err(e) => warn!("Failed to encode images for the cache: {}", e),
                }
                None
            }

            SessionEffect::CacheIndex { index } => {
                self.write(INDEX_KEY, &index.to_string());
                None
            }

            SessionEffect::ClearSnapshot => {
                for key in [IMAGES_KEY, INDEX_KEY] {
                    if let Err(e) = self.cache.remove(key) {
                        warn!("Failed to remove {} from session cache: {:#}", key, e);
                    }
                }
                None
            }

            SessionEffect::ClearAll => {
                if let Err(e) = self.cache.clear() {
                    warn!("Failed to clear session cache: {:#}", e);
                }
                None
            }

            SessionEffect::ShowError { message } => {
                self.banner = Some(message);
                None
            }

            SessionEffect::ClearError => {
                self.banner = None;
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.cache.set(key, value) {
            warn!("Failed to write {} to session cache: {:#}", key, e);
        }
    }
}

impl<A: ReviewApi, C: SessionCache> Drop for SessionDriver<A, C> {
    fn drop(&mut self) {
        if let SessionState::Reviewing { index, .. } = self.state {
            self.write(INDEX_KEY, &index.to_string());
        }
    }
}
