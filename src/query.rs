//! Async query handle for facade calls with loading-state tracking.
//!
//! A `Query<T>` wraps a facade operation, runs it on the tokio runtime and
//! exposes the `{data, loading: {is_loading, error}}` shape the presentation
//! layer renders from.
//!
//! # Example
//!
//! ```ignore
//! let portfolio = portfolio.clone();
//! let mut query = Query::new(move || {
//!     let portfolio = portfolio.clone();
//!     async move { portfolio.fetch_featured_projects().await }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::portfolio::{Fetched, LoadState};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// The facade answered (possibly with a degraded result)
  Ready(Fetched<T>),
  /// The fetch task went away without answering
  Failed(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, QueryState::Ready(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Ready(fetched) => Some(&fetched.data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Ready(fetched) => fetched.load.error.as_deref(),
      QueryState::Failed(e) => Some(e),
      _ => None,
    }
  }

  pub fn load_state(&self) -> LoadState {
    match self {
      QueryState::Idle => LoadState::done(None),
      QueryState::Loading => LoadState::loading(),
      QueryState::Ready(fetched) => fetched.load.clone(),
      QueryState::Failed(e) => LoadState::done(Some(e.clone())),
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Fetched<T>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for facade calls with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/ready states
/// - Async result handling via channels
/// - Discarding results that arrive after `cancel()` or `refetch()`
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Fetched<T>>>,
  fetched_at: Option<Instant>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Fetched<T>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  pub fn load_state(&self) -> LoadState {
    self.state.load_state()
  }

  /// Time since the last answer arrived.
  pub fn age(&self) -> Option<Duration> {
    self.fetched_at.map(|t| t.elapsed())
  }

  /// Take the answer out, leaving the query idle.
  pub fn take(&mut self) -> Option<Fetched<T>> {
    match std::mem::replace(&mut self.state, QueryState::Idle) {
      QueryState::Ready(fetched) => Some(fetched),
      other => {
        self.state = other;
        None
      }
    }
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch; an answer still in flight is discarded.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Stop listening for the pending answer. The fetch itself runs to
  /// completion but its result is dropped.
  pub fn cancel(&mut self) {
    if self.receiver.take().is_some() {
      self.state = QueryState::Idle;
    }
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(fetched) => {
        self.state = QueryState::Ready(fetched);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Failed("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver is gone after cancel/refetch
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
