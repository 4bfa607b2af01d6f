//! Read seam between the query facade and the remote table service.

use color_eyre::Result;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::client::AirtableClient;
use super::types::{AboutEntry, Project, ResearchOpsEntry};

/// Select-only access to the three portfolio tables.
pub trait RemoteStore: Send + Sync {
  /// Every project row
  fn projects(&self) -> BoxFuture<'_, Result<Vec<Project>>>;

  /// First About row for `page`. No matching row is `Ok(None)`.
  fn about<'a>(&'a self, page: &'a str) -> BoxFuture<'a, Result<Option<AboutEntry>>>;

  /// First Research Ops row
  fn research_ops(&self) -> BoxFuture<'_, Result<Option<ResearchOpsEntry>>>;
}

impl RemoteStore for AirtableClient {
  fn projects(&self) -> BoxFuture<'_, Result<Vec<Project>>> {
    self.get_projects().boxed()
  }

  fn about<'a>(&'a self, page: &'a str) -> BoxFuture<'a, Result<Option<AboutEntry>>> {
    self.get_about(page).boxed()
  }

  fn research_ops(&self) -> BoxFuture<'_, Result<Option<ResearchOpsEntry>>> {
    self.get_research_ops().boxed()
  }
}
