pub mod api;
pub mod model;

pub use api::*;
pub use model::*;

/// Version string reported by the service and the CLI.
///
/// Prefers a git hash injected at build time, falling back to the crate version.
pub fn service_version() -> String {
    match option_env!("SWIPELABEL_GIT_HASH") {
        Some(git_hash) if git_hash.len() >= 8 => git_hash[..8].to_string(),
        Some(git_hash) if !git_hash.is_empty() => git_hash.to_string(),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}
