//! Query facade: the single entry point for portfolio content.
//!
//! Every operation consults the cache first, refreshes through the remote
//! store when needed and degrades to cached, fixture or empty data on failure.
//! Nothing here returns an error; failures surface as a message in
//! [`LoadState::error`].

use std::sync::Arc;

use color_eyre::Result;
use tracing::{debug, info, warn};

use crate::airtable::{
  AboutEntry, AirtableClient, Category, PortfolioKey, Project, RemoteStore, ResearchOpsEntry,
};
use crate::cache::{CacheLayer, CacheResult, CacheSource, Cacheable, MemoryStorage};
use crate::config::Config;
use crate::fixtures;

/// How many projects the featured slice holds
pub const FEATURED_LIMIT: usize = 3;

/// Loading status handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadState {
  pub is_loading: bool,
  /// Human-readable failure, if the latest refresh failed
  pub error: Option<String>,
}

impl LoadState {
  pub fn loading() -> Self {
    Self {
      is_loading: true,
      error: None,
    }
  }

  pub fn done(error: Option<String>) -> Self {
    Self {
      is_loading: false,
      error,
    }
  }
}

/// Where a [`Fetched`] value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
  /// Fresh from the remote store
  Remote,
  /// Served from a fresh cache entry
  Cache,
  /// Refresh failed, served the last known cache entry
  StaleCache,
  /// Built-in fixture projects
  Fixtures,
  /// Nothing available
  Empty,
}

impl From<CacheSource> for DataSource {
  fn from(source: CacheSource) -> Self {
    match source {
      CacheSource::Network => DataSource::Remote,
      CacheSource::CacheFresh => DataSource::Cache,
      CacheSource::Offline => DataSource::StaleCache,
    }
  }
}

/// Result of a facade operation
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  pub data: T,
  pub load: LoadState,
  pub source: DataSource,
}

impl<T> Fetched<T> {
  fn new(data: T, source: DataSource, error: Option<String>) -> Self {
    Self {
      data,
      load: LoadState::done(error),
      source,
    }
  }

  fn from_cache_result(result: CacheResult<T>) -> Self {
    Self::new(result.data, result.source.into(), result.error)
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
    Fetched {
      data: f(self.data),
      load: self.load,
      source: self.source,
    }
  }
}

/// Cached, failure-tolerant access to projects, about pages and research ops.
#[derive(Clone)]
pub struct Portfolio {
  store: Option<Arc<dyn RemoteStore>>,
  cache: CacheLayer<MemoryStorage>,
  fixtures: bool,
}

impl Portfolio {
  /// `store` is `None` when credentials are missing; every operation then
  /// degrades without a network call.
  pub fn new(store: Option<Arc<dyn RemoteStore>>, cache: CacheLayer<MemoryStorage>) -> Self {
    Self {
      store,
      cache,
      fixtures: false,
    }
  }

  /// Serve fixture projects instead of an empty list when nothing else is available.
  pub fn with_fixtures(mut self, fixtures: bool) -> Self {
    self.fixtures = fixtures;
    self
  }

  /// Build the facade from configuration and environment credentials.
  pub fn from_config(config: &Config) -> Result<Self> {
    let cache = CacheLayer::new(MemoryStorage::new())
      .with_stale_time(config.fresh_for())
      .with_timeout(config.request_timeout());

    let store: Option<Arc<dyn RemoteStore>> = match Config::credentials() {
      Some(credentials) => {
        info!(base = %credentials.base_id_hint(), "using Airtable base");
        Some(Arc::new(AirtableClient::new(config, &credentials)?))
      }
      None => {
        warn!("Airtable configuration missing: set AIRTABLE_PAT and AIRTABLE_BASE_ID");
        None
      }
    };

    Ok(Self::new(store, cache).with_fixtures(config.fixtures))
  }

  /// All projects, ranked first in ascending rank, unranked after.
  pub async fn fetch_projects(&self) -> Fetched<Vec<Project>> {
    let Some(store) = &self.store else {
      debug!("no remote store, serving degraded project list");
      return self.degraded_projects(None);
    };

    let key = PortfolioKey::AllProjects.cache_key();
    let result = self
      .cache
      .fetch(&key, || async {
        let mut projects = store.projects().await?;
        sort_by_rank(&mut projects);
        Ok::<_, color_eyre::Report>(projects)
      })
      .await;

    match result {
      Ok(result) => {
        log_stale(&key, &result);
        Fetched::from_cache_result(result)
      }
      Err(e) => {
        warn!(key = %key, error = %e, "project fetch failed with nothing cached");
        self.degraded_projects(Some(e.to_string()))
      }
    }
  }

  /// Project whose slug equals `slug` exactly. An empty slug never matches.
  pub async fn fetch_project_by_slug(&self, slug: &str) -> Fetched<Option<Project>> {
    if slug.is_empty() {
      return Fetched::new(None, DataSource::Empty, None);
    }

    self
      .fetch_projects()
      .await
      .map(|projects| projects.into_iter().find(|p| p.slug == slug))
  }

  /// Up to [`FEATURED_LIMIT`] projects with a rank above zero, in ascending rank.
  pub async fn fetch_featured_projects(&self) -> Fetched<Vec<Project>> {
    self.fetch_projects().await.map(|projects| {
      let mut featured: Vec<Project> = projects.into_iter().filter(|p| p.is_featured()).collect();
      sort_by_rank(&mut featured);
      featured.truncate(FEATURED_LIMIT);
      featured
    })
  }

  /// Projects whose derived category is `category`, in list order.
  pub async fn fetch_projects_by_category(&self, category: Category) -> Fetched<Vec<Project>> {
    self.fetch_projects().await.map(|projects| {
      projects
        .into_iter()
        .filter(|p| p.derived_category() == category)
        .collect()
    })
  }

  /// About row for a page key such as "hero" or "about".
  pub async fn fetch_about_data_by_page(&self, page: &str) -> Fetched<Option<AboutEntry>> {
    let Some(store) = &self.store else {
      return Fetched::new(None, DataSource::Empty, None);
    };

    let key = PortfolioKey::About {
      page: page.to_string(),
    }
    .cache_key();

    self
      .fetch_optional(&key, || async { store.about(page).await })
      .await
  }

  pub async fn fetch_hero(&self) -> Fetched<Option<AboutEntry>> {
    self.fetch_about_data_by_page("hero").await
  }

  pub async fn fetch_about_page(&self) -> Fetched<Option<AboutEntry>> {
    self.fetch_about_data_by_page("about").await
  }

  /// The research ops entry (first row of its table).
  pub async fn fetch_research_ops_data(&self) -> Fetched<Option<ResearchOpsEntry>> {
    let Some(store) = &self.store else {
      return Fetched::new(None, DataSource::Empty, None);
    };

    let key = PortfolioKey::ResearchOps.cache_key();
    self
      .fetch_optional(&key, || async { store.research_ops().await })
      .await
  }

  /// Drop every cached entry.
  pub fn clear_cache(&self) {
    match self.cache.clear() {
      Ok(()) => info!("cache cleared"),
      Err(e) => warn!(error = %e, "failed to clear cache"),
    }
  }

  async fn fetch_optional<T, F, Fut>(&self, key: &str, fetcher: F) -> Fetched<Option<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>>>,
  {
    match self.cache.fetch(key, fetcher).await {
      Ok(result) => {
        log_stale(key, &result);
        Fetched::from_cache_result(result)
      }
      Err(e) => {
        warn!(key, error = %e, "fetch failed with nothing cached");
        Fetched::new(None, DataSource::Empty, Some(e.to_string()))
      }
    }
  }

  fn degraded_projects(&self, error: Option<String>) -> Fetched<Vec<Project>> {
    if self.fixtures {
      Fetched::new(fixtures::projects(), DataSource::Fixtures, error)
    } else {
      Fetched::new(Vec::new(), DataSource::Empty, error)
    }
  }
}

fn log_stale<T>(key: &str, result: &CacheResult<T>) {
  if let Some(error) = &result.error {
    warn!(key, error = %error, "refresh failed, serving cached data");
  }
}

/// Stable ascending sort by rank. Unranked projects, rank 0 included, go last
/// in their incoming order.
fn sort_by_rank(projects: &mut [Project]) {
  projects.sort_by_key(|p| match p.featured_rank {
    Some(rank) if p.is_featured() => (false, rank),
    _ => (true, 0),
  });
}
