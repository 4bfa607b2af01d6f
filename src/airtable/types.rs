use chrono::{DateTime, Utc};

/// Tag that marks a project as research-operations work when no explicit
/// category is set.
pub const OPS_TAG: &str = "UX Research Operations";

/// Project category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
  Research,
  Operations,
}

impl Category {
  pub const ALL: [Category; 2] = [Category::Research, Category::Operations];

  /// Label used by the Airtable `category` column
  pub fn label(&self) -> &'static str {
    match self {
      Category::Research => "UX Research",
      Category::Operations => OPS_TAG,
    }
  }

  /// Parse a category column value. Unknown labels yield `None`.
  pub fn from_label(label: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.label() == label.trim())
  }
}

/// Resized variant of an image attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
  pub url: String,
  pub width: u32,
  pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Thumbnails {
  pub small: Option<Thumbnail>,
  pub large: Option<Thumbnail>,
  pub full: Option<Thumbnail>,
}

/// File attached to a record (images, PDFs)
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
  pub id: String,
  pub url: String,
  pub filename: String,
  pub size: u64,
  pub mime_type: String,
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub thumbnails: Option<Thumbnails>,
}

/// Case study row
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
  pub id: String,
  pub slug: String,
  pub title: String,
  pub description: String,
  /// Markdown body
  pub content: String,
  pub tags: Vec<String>,
  pub featured_rank: Option<u32>,
  pub category: Option<Category>,
  pub url: Option<String>,
  pub images: Vec<Attachment>,
  pub created: DateTime<Utc>,
}

impl Project {
  /// Explicit category if set, otherwise derived from the tag set.
  pub fn derived_category(&self) -> Category {
    match self.category {
      Some(category) => category,
      None if self.tags.iter().any(|t| t == OPS_TAG) => Category::Operations,
      None => Category::Research,
    }
  }

  /// Rank 0 is the "not featured" sentinel.
  pub fn is_featured(&self) -> bool {
    matches!(self.featured_rank, Some(rank) if rank > 0)
  }

  pub fn image_url(&self) -> Option<&str> {
    self.images.first().map(|i| i.url.as_str())
  }

  /// Large thumbnail of the first image, falling back to the image itself
  pub fn thumbnail_url(&self) -> Option<&str> {
    let image = self.images.first()?;
    image
      .thumbnails
      .as_ref()
      .and_then(|t| t.large.as_ref())
      .map(|t| t.url.as_str())
      .or(Some(image.url.as_str()))
  }
}

/// Row of the About table, keyed by page (e.g. "hero", "about")
#[derive(Debug, Clone, PartialEq)]
pub struct AboutEntry {
  pub id: String,
  pub page: String,
  /// Markdown body
  pub description: String,
  pub images: Vec<Attachment>,
  pub created: DateTime<Utc>,
}

impl AboutEntry {
  pub fn image_url(&self) -> Option<&str> {
    self.images.first().map(|i| i.url.as_str())
  }
}

/// Research operations portfolio
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOpsEntry {
  pub id: String,
  pub name: String,
  pub pdfs: Vec<Attachment>,
  pub url: Option<String>,
}

impl ResearchOpsEntry {
  pub fn pdf_urls(&self) -> Vec<&str> {
    self.pdfs.iter().map(|p| p.url.as_str()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn project(tags: &[&str], category: Option<Category>) -> Project {
    Project {
      id: "rec1".to_string(),
      slug: "p".to_string(),
      title: String::new(),
      description: String::new(),
      content: String::new(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      featured_rank: None,
      category,
      url: None,
      images: Vec::new(),
      created: Utc::now(),
    }
  }

  #[test]
  fn test_explicit_category_wins_over_tags() {
    let p = project(&[OPS_TAG], Some(Category::Research));
    assert_eq!(p.derived_category(), Category::Research);
  }

  #[test]
  fn test_ops_tag_derives_operations() {
    let p = project(&["UX Research", OPS_TAG], None);
    assert_eq!(p.derived_category(), Category::Operations);
  }

  #[test]
  fn test_untagged_defaults_to_research() {
    assert_eq!(project(&[], None).derived_category(), Category::Research);
  }

  #[test]
  fn test_rank_zero_is_not_featured() {
    let mut p = project(&[], None);
    p.featured_rank = Some(0);
    assert!(!p.is_featured());
    p.featured_rank = Some(1);
    assert!(p.is_featured());
    p.featured_rank = None;
    assert!(!p.is_featured());
  }

  #[test]
  fn test_category_labels() {
    assert_eq!(Category::from_label("UX Research"), Some(Category::Research));
    assert_eq!(Category::from_label(OPS_TAG), Some(Category::Operations));
    assert_eq!(Category::from_label("Design"), None);
  }
}
