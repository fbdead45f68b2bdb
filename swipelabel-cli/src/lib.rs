pub mod cache;
pub mod client;
pub mod driver;
pub mod session;

pub use cache::{FileSessionCache, MemorySessionCache, SessionCache, SessionSnapshot};
pub use client::{ApiFailure, HttpReviewApi, ReviewApi};
pub use driver::SessionDriver;
pub use session::{SessionEffect, SessionEvent, SessionState};
