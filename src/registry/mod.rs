pub mod client;
pub mod discovery;
pub mod endpoint;
pub mod listing;
pub mod locator;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ListingSource, RegistryClient};
pub use discovery::{discover_variants, discover_versions, VersionPolicy};
pub use endpoint::RegistryEndpoint;
pub use listing::{Entry, Listing, ListingNode};
pub use locator::{locate_artifacts, ArtifactCandidate, ArtifactMatch, ArtifactRules};
