//! Checkpointed image enrichment for vehicle datasets.
//!
//! For each record without a photo, a search provider proposes candidate
//! image URLs, the inspector keeps the first one that is at least 1280x720 and
//! labels its dominant color, and the dataset file is rewritten atomically
//! before moving on.
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod inspector;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod status;
pub mod store;
pub mod workflow;
