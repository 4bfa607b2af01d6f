//! Cached, read-only access to a UX research portfolio kept in Airtable.

pub mod airtable;
pub mod cache;
pub mod commands;
pub mod config;
pub mod filter;
pub mod fixtures;
pub mod portfolio;
pub mod query;
