//! Action references and their GitHub repository metadata.

mod cache;
mod client;
mod reference;

pub use cache::MetadataCache;
pub use client::{ActionMetadata, GitHubClient};
pub use reference::{is_valid_action_ref, parse_action_ref, ActionRef};
