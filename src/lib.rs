//! # Match Coach
//!
//! Valorant match analysis with AI-generated coaching feedback.
//!
//! ## Architecture
//!
//! - **models**: Match document view and derived summaries
//! - **calculate**: Player, round and combat summaries (first bloods, multi-kills, clutches)
//! - **fetch**: Cached HTTP fetching and the match API client
//! - **storage**: Summary cache and feedback history (JSON, JSONL)
//! - **agents**: Text-generation backends and the coach agent
//! - **pipeline**: Fetch, analyze, coach, record
//! - **config**: Configuration loading and validation

pub mod agents;
pub mod calculate;
pub mod config;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use models::*;
