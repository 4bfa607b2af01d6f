//! Built-in projects served in fixture mode when the remote store is unavailable.

use chrono::{DateTime, TimeZone, Utc};

use crate::airtable::types::OPS_TAG;
use crate::airtable::{Category, Project};

fn created(year: i32, month: u32, day: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(year, month, day, 10, 0, 0)
    .single()
    .unwrap_or_else(Utc::now)
}

fn tags(list: &[&str]) -> Vec<String> {
  list.iter().map(|t| t.to_string()).collect()
}

pub fn projects() -> Vec<Project> {
  vec![
    Project {
      id: "fixture-1".to_string(),
      slug: "banking-app-user-research".to_string(),
      title: "Banking App User Research".to_string(),
      description: "User research for a mobile banking app, focused on trust and everyday tasks."
        .to_string(),
      content: "# Banking App User Research\n\n\
        Interviews, usability rounds and a survey for a mobile banking app.\n\n\
        ## Key Findings\n\n\
        - Visible security cues drive trust\n\
        - Everyday tasks need short navigation paths\n"
        .to_string(),
      tags: tags(&["UX Research", "User Interviews", "Usability Testing", "Mobile"]),
      featured_rank: Some(1),
      category: Some(Category::Research),
      url: Some("https://example.com/banking-research".to_string()),
      images: Vec::new(),
      created: created(2024, 1, 15),
    },
    Project {
      id: "fixture-2".to_string(),
      slug: "research-ops-framework".to_string(),
      title: "Research Operations Framework".to_string(),
      description: "A framework for scaling research across several product teams.".to_string(),
      content: "# Research Operations Framework\n\n\
        Repository, templates and participant recruitment shared across teams.\n\n\
        ## Impact\n\n\
        - Faster study setup\n\
        - Consistent research quality\n"
        .to_string(),
      tags: tags(&[OPS_TAG, "Process Design", "Knowledge Management"]),
      featured_rank: Some(2),
      category: Some(Category::Operations),
      url: None,
      images: Vec::new(),
      created: created(2024, 2, 1),
    },
    Project {
      id: "fixture-3".to_string(),
      slug: "ecommerce-checkout-optimization".to_string(),
      title: "E-commerce Checkout Optimization".to_string(),
      description: "Usability testing and analytics to simplify an online checkout.".to_string(),
      content: "# E-commerce Checkout Optimization\n\n\
        Comparative usability tests, funnel analytics and post-purchase surveys.\n"
        .to_string(),
      tags: tags(&["UX Research", "A/B Testing", "E-commerce"]),
      featured_rank: None,
      category: Some(Category::Research),
      url: None,
      images: Vec::new(),
      created: created(2024, 3, 10),
    },
  ]
}
