//! CLI subcommands, one per facade operation.

use clap::{Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::airtable::{AboutEntry, Category, Project, ResearchOpsEntry};
use crate::filter::{all_tags, filter_projects, CategoryFilter, FilterCriteria};
use crate::portfolio::{Fetched, Portfolio};
use crate::query::{Query, QueryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
  All,
  Research,
  Ops,
}

impl From<CategoryArg> for CategoryFilter {
  fn from(arg: CategoryArg) -> Self {
    match arg {
      CategoryArg::All => CategoryFilter::All,
      CategoryArg::Research => CategoryFilter::Only(Category::Research),
      CategoryArg::Ops => CategoryFilter::Only(Category::Operations),
    }
  }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
  /// List projects, optionally filtered
  Projects {
    #[arg(short, long, value_enum, default_value_t = CategoryArg::All)]
    category: CategoryArg,
    /// Case-insensitive text to look for in titles, descriptions, content and tags
    #[arg(short, long, default_value = "")]
    search: String,
    /// Keep projects carrying every given tag (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,
  },
  /// Show the featured projects
  Featured,
  /// Show one project by slug
  Project { slug: String },
  /// Show an about page entry ("hero" or "about")
  About {
    #[arg(default_value = "about")]
    page: String,
  },
  /// Show the research operations portfolio
  ResearchOps,
  /// List every tag in use
  Tags,
}

/// Run a command against the facade and print the outcome.
pub async fn run(command: Command, portfolio: &Portfolio, retries: u32) {
  match command {
    Command::Projects {
      category,
      search,
      tags,
    } => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        async move { p.fetch_projects().await }
      })
      .await;

      let Some(fetched) = fetched else { return };
      let criteria = FilterCriteria {
        category: category.into(),
        search,
        tags: tags.into_iter().collect::<BTreeSet<_>>(),
      };
      let projects = filter_projects(&fetched.data, &criteria);
      if projects.is_empty() {
        if criteria.is_empty() {
          println!("No projects found.");
        } else {
          println!("No projects match the current filters.");
        }
      }
      for project in projects {
        print_project_line(project);
      }
    }
    Command::Featured => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        async move { p.fetch_featured_projects().await }
      })
      .await;

      let Some(fetched) = fetched else { return };
      if fetched.data.is_empty() {
        println!("No featured projects found.");
      }
      for category in Category::ALL {
        let group: Vec<&Project> = fetched
          .data
          .iter()
          .filter(|p| p.derived_category() == category)
          .collect();
        if group.is_empty() {
          continue;
        }
        println!("{}:", category.label());
        for project in group {
          print_project_line(project);
        }
      }
    }
    Command::Project { slug } => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        let slug = slug.clone();
        async move { p.fetch_project_by_slug(&slug).await }
      })
      .await;

      match fetched.and_then(|f| f.data) {
        Some(project) => print_project(&project),
        None => println!("The project you are looking for could not be found."),
      }
    }
    Command::About { page } => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        let page = page.clone();
        async move {
          match page.as_str() {
            "hero" => p.fetch_hero().await,
            "about" => p.fetch_about_page().await,
            other => p.fetch_about_data_by_page(other).await,
          }
        }
      })
      .await;

      match fetched.and_then(|f| f.data) {
        Some(entry) => print_about(&entry),
        None => println!("No content for this page yet."),
      }
    }
    Command::ResearchOps => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        async move { p.fetch_research_ops_data().await }
      })
      .await;

      match fetched.and_then(|f| f.data) {
        Some(entry) => print_research_ops(&entry),
        None => println!("No research operations portfolio available."),
      }
    }
    Command::Tags => {
      let p = portfolio.clone();
      let fetched = load(retries, move || {
        let p = p.clone();
        async move { p.fetch_projects().await }
      })
      .await;

      if let Some(fetched) = fetched {
        for tag in all_tags(&fetched.data) {
          println!("{}", tag);
        }
      }
    }
  }
}

/// Drive a query to completion, showing a loading notice and retrying
/// degraded answers up to `retries` times. Ctrl-C abandons the query.
async fn load<T, F, Fut>(retries: u32, fetcher: F) -> Option<Fetched<T>>
where
  T: Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Fetched<T>> + Send + 'static,
{
  let mut query = Query::new(fetcher);
  let mut attempts_left = retries;
  let mut ticker = tokio::time::interval(Duration::from_millis(50));
  let mut ticks = 0u32;
  let interrupted = tokio::signal::ctrl_c();
  tokio::pin!(interrupted);

  query.fetch();
  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      _ = &mut interrupted => {
        query.cancel();
        eprintln!("Cancelled.");
        return None;
      }
    }

    ticks += 1;
    if ticks == 10 && query.load_state().is_loading {
      eprintln!("Loading...");
    }

    if !query.poll() {
      continue;
    }

    if let QueryState::Failed(e) = query.state() {
      eprintln!("Error: {}", e);
      return None;
    }

    let error = query.load_state().error;
    match error {
      Some(e) if attempts_left > 0 => {
        warn!(error = %e, attempts_left, "retrying");
        attempts_left -= 1;
        query.refetch();
      }
      Some(e) => {
        eprintln!("Error loading content: {} (retry with --retry <N>)", e);
        return query.take();
      }
      None => return query.take(),
    }
  }
}

fn print_project_line(project: &Project) {
  let rank = project
    .featured_rank
    .filter(|_| project.is_featured())
    .map(|r| format!("#{} ", r))
    .unwrap_or_default();
  println!("  {}{} [{}]", rank, display_title(project), project.slug);
  if !project.description.is_empty() {
    println!("      {}", project.description);
  }
}

fn display_title(project: &Project) -> &str {
  if project.title.is_empty() {
    &project.slug
  } else {
    &project.title
  }
}

fn print_project(project: &Project) {
  println!("{}", display_title(project));
  println!("Category: {}", project.derived_category().label());
  if !project.tags.is_empty() {
    println!("Tags: {}", project.tags.join(", "));
  }
  if let Some(url) = &project.url {
    println!("Link: {}", url);
  }
  if let Some(image) = project.thumbnail_url() {
    println!("Image: {}", image);
  }
  println!("Created: {}", project.created.format("%Y-%m-%d"));
  if !project.description.is_empty() {
    println!("\n{}", project.description);
  }
  if !project.content.is_empty() {
    println!("\n{}", project.content);
  }
}

fn print_about(entry: &AboutEntry) {
  if let Some(image) = entry.image_url() {
    println!("Image: {}\n", image);
  }
  println!("{}", entry.description);
}

fn print_research_ops(entry: &ResearchOpsEntry) {
  println!("{}", entry.name);
  if let Some(url) = &entry.url {
    println!("Link: {}", url);
  }
  let pdfs = entry.pdf_urls();
  if pdfs.is_empty() {
    println!("No documents attached.");
  }
  for url in pdfs {
    println!("  {}", url);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::portfolio::{DataSource, LoadState};
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[test]
  fn test_category_arg_maps_to_filter() {
    assert_eq!(CategoryFilter::from(CategoryArg::All), CategoryFilter::All);
    assert_eq!(
      CategoryFilter::from(CategoryArg::Ops),
      CategoryFilter::Only(Category::Operations)
    );
  }

  #[tokio::test]
  async fn test_load_retries_degraded_answers() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let fetched = load(2, move || {
      let counter = counter.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let error = (n < 1).then(|| "Failed to reach Airtable".to_string());
        Fetched {
          data: n,
          load: LoadState::done(error),
          source: DataSource::Remote,
        }
      }
    })
    .await
    .unwrap();

    assert_eq!(fetched.data, 1);
    assert_eq!(fetched.load.error, None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_load_waits_across_many_ticks() {
    let fetched = load(0, || async {
      tokio::time::sleep(Duration::from_millis(300)).await;
      Fetched {
        data: "slow",
        load: LoadState::done(None),
        source: DataSource::Remote,
      }
    })
    .await
    .unwrap();

    assert_eq!(fetched.data, "slow");
  }

  #[tokio::test]
  async fn test_load_returns_degraded_answer_when_out_of_retries() {
    let fetched = load(0, || async {
      Fetched {
        data: Vec::<u32>::new(),
        load: LoadState::done(Some("boom".to_string())),
        source: DataSource::Empty,
      }
    })
    .await
    .unwrap();

    assert!(fetched.data.is_empty());
    assert_eq!(fetched.load.error.as_deref(), Some("boom"));
  }
}
