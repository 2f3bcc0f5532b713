//! Marketplace domain: ads, category vocabulary and lifecycle rules.

/// Ad record and status
pub mod ad;
/// Lifecycle rules for publishing, editing, renewing and retiring ads
pub mod rules;
/// Category / mode / tag vocabulary registry
pub mod vocabulary;

pub use ad::{Ad, AdId, AdStatus};
pub use rules::RuleError;
