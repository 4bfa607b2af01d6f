//! In-memory filtering over an already fetched project list.

use std::collections::BTreeSet;

use crate::airtable::{Category, Project};

/// Category selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category),
}

/// User-entered filter state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
  pub category: CategoryFilter,
  pub search: String,
  /// Every selected tag must be present on a project
  pub tags: BTreeSet<String>,
}

impl FilterCriteria {
  pub fn is_empty(&self) -> bool {
    self.category == CategoryFilter::All && self.search.trim().is_empty() && self.tags.is_empty()
  }

  fn matches(&self, project: &Project, needle: Option<&str>) -> bool {
    if let CategoryFilter::Only(category) = self.category {
      if project.derived_category() != category {
        return false;
      }
    }

    if let Some(needle) = needle {
      if !matches_search(project, needle) {
        return false;
      }
    }

    self
      .tags
      .iter()
      .all(|tag| project.tags.iter().any(|t| t == tag))
  }
}

/// Apply category, search and tag filters conjunctively.
///
/// Input order is preserved.
pub fn filter_projects<'a>(projects: &'a [Project], criteria: &FilterCriteria) -> Vec<&'a Project> {
  let term = criteria.search.trim();
  let needle = (!term.is_empty()).then(|| term.to_lowercase());

  projects
    .iter()
    .filter(|p| criteria.matches(p, needle.as_deref()))
    .collect()
}

/// Distinct tags across `projects`, sorted.
pub fn all_tags(projects: &[Project]) -> Vec<String> {
  projects
    .iter()
    .flat_map(|p| p.tags.iter().cloned())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Case-insensitive substring match over title, description, content and tags.
/// `needle` must already be lowercase.
fn matches_search(project: &Project, needle: &str) -> bool {
  let contains = |s: &str| s.to_lowercase().contains(needle);

  contains(&project.title)
    || contains(&project.description)
    || contains(&project.content)
    || project.tags.iter().any(|t| contains(t))
}
