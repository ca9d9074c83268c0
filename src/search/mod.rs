//! Candidate image discovery.
//!
//! A provider turns a record's identifying fields into a finite, ordered
//! stream of candidate URLs. Variants only differ in how they build the query
//! and which results they keep; the pipeline never knows which one is active.
mod duckduckgo;
mod google;

pub use duckduckgo::DuckDuckGo;
pub use google::Google;

use crate::error::ProviderError;
use crate::http::HttpClient;
use crate::record::{CarQuery, Dimensions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of candidates taken from a single provider.
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// An unvalidated image URL proposed by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    /// Resolution reported by the search surface, if any. Informational only;
    /// the inspector's measurement is authoritative.
    pub discovered: Option<Dimensions>,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            discovered: None,
        }
    }
}

/// Lazy candidate stream borrowed from its provider.
pub type Candidates<'a> = Box<dyn Iterator<Item = Candidate> + 'a>;

pub trait SearchProvider {
    fn name(&self) -> &'static str;

    /// Run the query. Errors here are absorbed by [`Self::find_candidates`].
    fn search(&mut self, query: &CarQuery) -> Result<Candidates<'_>, ProviderError>;

    /// At most `limit` candidates in relevance order; a failed query is
    /// reported as an empty stream.
    fn find_candidates(&mut self, query: &CarQuery, limit: usize) -> Candidates<'_> {
        let name = self.name();
        match self.search(query) {
            Ok(candidates) => Box::new(candidates.take(limit)),
            Err(err) => {
                tracing::warn!(provider = name, query = %query, error = %err, "search failed");
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Search surfaces that ship with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Duckduckgo,
    Google,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Duckduckgo => "duckduckgo",
            ProviderKind::Google => "google",
        }
    }

    pub fn build(&self, client: HttpClient) -> Box<dyn SearchProvider> {
        match self {
            ProviderKind::Duckduckgo => Box::new(DuckDuckGo::new(client)),
            ProviderKind::Google => Box::new(Google::new(client)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Providers queried one after another.
///
/// The next provider is only asked once every candidate of the previous one
/// has been consumed, and each contributes at most `limit` candidates.
pub struct FallbackChain {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_kinds(kinds: &[ProviderKind], client: &HttpClient) -> Self {
        Self::new(kinds.iter().map(|kind| kind.build(client.clone())).collect())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl SearchProvider for FallbackChain {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn search(&mut self, query: &CarQuery) -> Result<Candidates<'_>, ProviderError> {
        Ok(self.find_candidates(query, DEFAULT_MAX_CANDIDATES))
    }

    fn find_candidates(&mut self, query: &CarQuery, limit: usize) -> Candidates<'_> {
        let query = query.clone();
        Box::new(
            self.providers
                .iter_mut()
                .flat_map(move |provider| provider.find_candidates(&query, limit)),
        )
    }
}

/// Lowercased identifying tokens used by extraction rules.
#[derive(Debug, Clone)]
pub(crate) struct RelevanceTerms {
    make: String,
    model: String,
    year: String,
}

impl RelevanceTerms {
    pub(crate) fn new(query: &CarQuery) -> Self {
        Self {
            make: query.make.trim().to_lowercase(),
            model: query.model.trim().to_lowercase(),
            year: query.year.to_string(),
        }
    }

    /// True when the text mentions the make, the model or the year.
    pub(crate) fn mentioned_in(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        [&self.make, &self.model, &self.year]
            .into_iter()
            .any(|term| !term.is_empty() && text.contains(term.as_str()))
    }

    /// True when the text mentions the make.
    pub(crate) fn make_in(&self, text: &str) -> bool {
        !self.make.is_empty() && text.to_lowercase().contains(&self.make)
    }
}
