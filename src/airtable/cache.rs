//! Caching implementations for portfolio types.

use crate::cache::Cacheable;

use super::types::{AboutEntry, Project, ResearchOpsEntry};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Project {
  fn entity_type() -> &'static str {
    "project"
  }
}

impl Cacheable for AboutEntry {
  fn entity_type() -> &'static str {
    "about"
  }
}

impl Cacheable for ResearchOpsEntry {
  fn entity_type() -> &'static str {
    "research_ops"
  }
}

// ============================================================================
// Cache keys
// ============================================================================

/// One cache key per table query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortfolioKey {
  /// Every project
  AllProjects,
  /// About row for a page
  About { page: String },
  /// The research ops singleton
  ResearchOps,
}

impl PortfolioKey {
  pub fn cache_key(&self) -> String {
    match self {
      Self::AllProjects => "all_projects".to_string(),
      Self::About { page } => format!("about_{}", page),
      Self::ResearchOps => "research_ops".to_string(),
    }
  }
}
