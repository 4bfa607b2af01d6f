//! Serde-deserializable types matching Airtable REST responses.
//!
//! These types are separate from domain types so that loosely-typed rows
//! (missing cells, wrong cell types) can be mapped onto strict domain values
//! in one place.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use super::types::{
  AboutEntry, Attachment, Category, Project, ResearchOpsEntry, Thumbnail, Thumbnails,
};

// ============================================================================
// List endpoint envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiListResponse<F> {
  #[serde(default = "Vec::new")]
  pub records: Vec<ApiRecord<F>>,
  /// Present while more pages remain
  pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRecord<F> {
  pub id: String,
  #[serde(rename = "createdTime")]
  pub created_time: Option<DateTime<Utc>>,
  pub fields: F,
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiThumbnail {
  pub url: String,
  #[serde(default)]
  pub width: u32,
  #[serde(default)]
  pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiThumbnails {
  pub small: Option<ApiThumbnail>,
  pub large: Option<ApiThumbnail>,
  pub full: Option<ApiThumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAttachment {
  pub id: String,
  pub url: String,
  #[serde(default)]
  pub filename: String,
  #[serde(default)]
  pub size: u64,
  #[serde(rename = "type", default)]
  pub mime_type: String,
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub thumbnails: Option<ApiThumbnails>,
}

// ============================================================================
// Table rows
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiProjectFields {
  pub title: Option<String>,
  pub slug: Option<String>,
  pub description: Option<String>,
  pub content: Option<String>,
  // Lookup and formula columns may come back as a scalar, so keep it loose
  pub tags: Option<serde_json::Value>,
  pub featured_id: Option<f64>,
  pub category: Option<String>,
  pub url: Option<String>,
  #[serde(default)]
  pub image: Vec<ApiAttachment>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiAboutFields {
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub page: String,
  #[serde(default)]
  pub image: Vec<ApiAttachment>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiResearchOpsFields {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub pdf: Vec<ApiAttachment>,
  pub url: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiThumbnail> for Thumbnail {
  fn from(t: ApiThumbnail) -> Self {
    Thumbnail {
      url: t.url,
      width: t.width,
      height: t.height,
    }
  }
}

impl From<ApiAttachment> for Attachment {
  fn from(a: ApiAttachment) -> Self {
    Attachment {
      id: a.id,
      url: a.url,
      filename: a.filename,
      size: a.size,
      mime_type: a.mime_type,
      width: a.width,
      height: a.height,
      thumbnails: a.thumbnails.map(|t| Thumbnails {
        small: t.small.map(Thumbnail::from),
        large: t.large.map(Thumbnail::from),
        full: t.full.map(Thumbnail::from),
      }),
    }
  }
}

impl ApiRecord<ApiProjectFields> {
  /// `fetched_at` stands in for a missing `createdTime`.
  pub fn into_project(self, fetched_at: DateTime<Utc>) -> Project {
    let f = self.fields;
    let featured_rank = f.featured_id.and_then(|n| {
      let rank = rank_from_number(n);
      if rank.is_none() {
        warn!(record = %self.id, value = n, "ignoring featured_id that is not a valid rank");
      }
      rank
    });
    Project {
      id: self.id,
      slug: f.slug.unwrap_or_default(),
      title: f.title.unwrap_or_default(),
      description: f.description.unwrap_or_default(),
      content: f.content.unwrap_or_default(),
      tags: extract_tags(f.tags.as_ref()),
      featured_rank,
      category: f.category.as_deref().and_then(Category::from_label),
      url: f.url.filter(|u| !u.is_empty()),
      images: f.image.into_iter().map(Attachment::from).collect(),
      created: self.created_time.unwrap_or(fetched_at),
    }
  }
}

impl ApiRecord<ApiAboutFields> {
  pub fn into_about(self, fetched_at: DateTime<Utc>) -> AboutEntry {
    AboutEntry {
      id: self.id,
      page: self.fields.page,
      description: self.fields.description,
      images: self
        .fields
        .image
        .into_iter()
        .map(Attachment::from)
        .collect(),
      created: self.created_time.unwrap_or(fetched_at),
    }
  }
}

impl ApiRecord<ApiResearchOpsFields> {
  pub fn into_research_ops(self) -> ResearchOpsEntry {
    ResearchOpsEntry {
      id: self.id,
      name: self.fields.name,
      pdfs: self.fields.pdf.into_iter().map(Attachment::from).collect(),
      url: self.fields.url.filter(|u| !u.is_empty()),
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Only an array of strings counts as tags; anything else is treated as none.
fn extract_tags(value: Option<&serde_json::Value>) -> Vec<String> {
  value
    .and_then(|v| v.as_array())
    .map(|items| {
      items
        .iter()
        .filter_map(|t| t.as_str())
        .map(String::from)
        .collect()
    })
    .unwrap_or_default()
}

/// Airtable numbers are JSON floats. Only whole numbers in `u32` range are
/// ranks; fractional, negative or non-finite values mean unranked.
fn rank_from_number(n: f64) -> Option<u32> {
  if n.is_finite() && n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 {
    Some(n as u32)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn parse_projects(body: serde_json::Value) -> Vec<Project> {
    let response: ApiListResponse<ApiProjectFields> = serde_json::from_value(body).unwrap();
    let now = Utc::now();
    response
      .records
      .into_iter()
      .map(|r| r.into_project(now))
      .collect()
  }

  #[test]
  fn test_project_row_maps_all_fields() {
    let projects = parse_projects(json!({
      "records": [{
        "id": "recA",
        "createdTime": "2024-01-15T10:00:00.000Z",
        "fields": {
          "title": "Banking App User Research",
          "slug": "banking-app",
          "description": "Trust in mobile banking",
          "content": "# Banking\n\nFindings",
          "tags": ["UX Research", "Mobile"],
          "featured_id": 2,
          "category": "UX Research",
          "url": "https://example.com/banking",
          "image": [{
            "id": "att1",
            "url": "https://cdn.example.com/a.png",
            "filename": "a.png",
            "size": 1024,
            "type": "image/png",
            "width": 800,
            "height": 600,
            "thumbnails": {
              "large": { "url": "https://cdn.example.com/a-large.png", "width": 512, "height": 384 }
            }
          }]
        }
      }]
    }));

    let p = &projects[0];
    assert_eq!(p.id, "recA");
    assert_eq!(p.slug, "banking-app");
    assert_eq!(p.tags, vec!["UX Research", "Mobile"]);
    assert_eq!(p.featured_rank, Some(2));
    assert_eq!(p.category, Some(Category::Research));
    assert_eq!(p.images[0].mime_type, "image/png");
    assert_eq!(p.thumbnail_url(), Some("https://cdn.example.com/a-large.png"));
    assert_eq!(p.created.to_rfc3339(), "2024-01-15T10:00:00+00:00");
  }

  #[test]
  fn test_sparse_project_row_uses_defaults() {
    let projects = parse_projects(json!({
      "records": [{ "id": "recB", "fields": { "tags": "not-a-list", "category": "Other" } }]
    }));

    let p = &projects[0];
    assert_eq!(p.slug, "");
    assert_eq!(p.content, "");
    assert!(p.tags.is_empty());
    assert_eq!(p.category, None);
    assert_eq!(p.featured_rank, None);
    assert!(p.images.is_empty());
  }

  #[test]
  fn test_negative_rank_is_unranked() {
    assert_eq!(rank_from_number(-1.0), None);
    assert_eq!(rank_from_number(f64::NAN), None);
    assert_eq!(rank_from_number(0.0), Some(0));
    assert_eq!(rank_from_number(3.0), Some(3));
  }

  #[test]
  fn test_fractional_rank_is_unranked() {
    assert_eq!(rank_from_number(0.4), None);
    assert_eq!(rank_from_number(1.5), None);
    assert_eq!(rank_from_number(2.4), None);
    assert_eq!(rank_from_number(2.0), Some(2));

    let projects = parse_projects(json!({
      "records": [
        { "id": "recA", "fields": { "slug": "a", "featured_id": 1.5 } },
        { "id": "recB", "fields": { "slug": "b", "featured_id": 2 } }
      ]
    }));
    assert_eq!(projects[0].featured_rank, None);
    assert!(!projects[0].is_featured());
    assert_eq!(projects[1].featured_rank, Some(2));
  }

  #[test]
  fn test_offset_is_read() {
    let response: ApiListResponse<ApiAboutFields> = serde_json::from_value(json!({
      "records": [{ "id": "rec1", "fields": { "page": "hero", "description": "Hi" } }],
      "offset": "itr123"
    }))
    .unwrap();

    assert_eq!(response.offset.as_deref(), Some("itr123"));
    let about = response
      .records
      .into_iter()
      .next()
      .unwrap()
      .into_about(Utc::now());
    assert_eq!(about.page, "hero");
    assert_eq!(about.description, "Hi");
  }

  #[test]
  fn test_research_ops_row() {
    let response: ApiListResponse<ApiResearchOpsFields> = serde_json::from_value(json!({
      "records": [{
        "id": "recR",
        "fields": {
          "name": "Ops Portfolio",
          "pdf": [{ "id": "att2", "url": "https://cdn.example.com/ops.pdf", "type": "application/pdf" }],
          "url": ""
        }
      }]
    }))
    .unwrap();

    let entry = response
      .records
      .into_iter()
      .next()
      .unwrap()
      .into_research_ops();
    assert_eq!(entry.name, "Ops Portfolio");
    assert_eq!(entry.pdf_urls(), vec!["https://cdn.example.com/ops.pdf"]);
    assert_eq!(entry.url, None);
  }
}
