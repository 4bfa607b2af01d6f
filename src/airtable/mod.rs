//! Remote store client for the Airtable base holding the portfolio content.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod store;
pub mod types;

pub use cache::PortfolioKey;
pub use client::AirtableClient;
pub use store::RemoteStore;
pub use types::{AboutEntry, Attachment, Category, Project, ResearchOpsEntry};
