//! Checkpointed enrichment pipeline.
//!
//! Walks an inclusive 1-based index range of the collection in order. For
//! every record without an image it asks the provider for candidates, keeps
//! the first one the inspector measures at or above the resolution gate,
//! classifies its color, and persists the whole collection right away. A
//! crash therefore loses at most the record being worked on.
//!
//! Provider and fetch failures are misses, not errors. Only an invalid range
//! or a failed persist ends a run early; an interrupt ends it cleanly.
mod cancel;

pub use cancel::{install_interrupt_handler, CancellationToken};

use crate::error::RunError;
use crate::inspector::{meets_resolution, ImageInspector};
use crate::record::{CarQuery, CarRecord, Dimensions};
use crate::search::{SearchProvider, DEFAULT_MAX_CANDIDATES};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Knobs that do not change the pipeline's contract.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Candidates taken from each provider per record.
    pub max_candidates: usize,
    /// Compute a missing color for records that already have an image.
    pub backfill_colors: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            backfill_colors: false,
        }
    }
}

/// Where the pipeline is; indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scanning(usize),
    Searching(usize),
    Validating(usize),
    Writing(usize),
    Done,
    Interrupted,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Done => "done",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters returned to the caller; never persisted with the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub start: usize,
    pub end: usize,
    /// Records that have an image after the run (skipped ones included).
    pub found: usize,
    /// Records for which no candidate qualified.
    pub lost: usize,
    /// Records already enriched before the run.
    pub skipped: usize,
    /// Records whose missing color was filled in.
    pub backfilled: usize,
    /// Records fully processed.
    pub processed: usize,
    /// 1-based index of the last fully processed record, 0 if none.
    pub last_index: usize,
    /// Number of dataset writes performed.
    pub writes: usize,
}

impl RunSummary {
    fn new(range: &RangeInclusive<usize>) -> Self {
        Self {
            status: RunStatus::Done,
            start: *range.start(),
            end: *range.end(),
            found: 0,
            lost: 0,
            skipped: 0,
            backfilled: 0,
            processed: 0,
            last_index: 0,
            writes: 0,
        }
    }
}

/// Check `1 <= start <= end <= len`; `end` defaults to `len`.
pub fn validate_range(
    start: usize,
    end: Option<usize>,
    len: usize,
) -> Result<RangeInclusive<usize>, RunError> {
    let end = end.unwrap_or(len);
    if start < 1 || start > end || end > len {
        return Err(RunError::Range { start, end, len });
    }
    Ok(start..=end)
}

struct Winner {
    url: String,
    size: Dimensions,
    color: String,
}

enum SearchOutcome {
    Winner(Winner),
    Miss,
    Interrupted,
}

/// Single sequential worker that owns its provider, inspector and store for
/// the duration of a run.
pub struct EnrichmentPipeline<P, I, S> {
    provider: P,
    inspector: I,
    store: S,
    cancel: CancellationToken,
    options: PipelineOptions,
    state: PipelineState,
}

impl<P, I, S> EnrichmentPipeline<P, I, S>
where
    P: SearchProvider,
    I: ImageInspector,
    S: RecordStore,
{
    pub fn new(provider: P, inspector: I, store: S, cancel: CancellationToken) -> Self {
        Self {
            provider,
            inspector,
            store,
            cancel,
            options: PipelineOptions::default(),
            state: PipelineState::Idle,
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Enrich `records[start..=end]` (1-based, inclusive).
    ///
    /// The range is validated before any I/O. Each success is persisted
    /// immediately through the store; the final flush only writes when the
    /// in-memory collection holds changes the store has not seen.
    pub fn run(
        &mut self,
        records: &mut [CarRecord],
        start: usize,
        end: usize,
    ) -> Result<RunSummary, RunError> {
        let range = validate_range(start, Some(end), records.len())?;
        let total = records.len();
        let mut summary = RunSummary::new(&range);
        let mut dirty = false;
        tracing::info!(start, end, total, "enrichment run started");

        for index in range {
            if self.cancel.is_cancelled() {
                return self.interrupt(records, summary, dirty);
            }
            self.state = PipelineState::Scanning(index);
            let slot = index - 1;

            if records[slot].is_enriched() {
                summary.found += 1;
                summary.skipped += 1;
                tracing::info!(
                    index,
                    record = %records[slot].label(),
                    found = summary.found,
                    total,
                    "image already present, skipping"
                );
                if self.options.backfill_colors && records[slot].needs_color() {
                    self.backfill_color(records, slot, index, &mut summary, &mut dirty)?;
                }
                summary.processed += 1;
                summary.last_index = index;
                continue;
            }

            let query = records[slot].query();
            match self.find_winner(&query, index) {
                SearchOutcome::Winner(winner) => {
                    self.state = PipelineState::Writing(index);
                    tracing::info!(
                        index,
                        record = %query,
                        url = %winner.url,
                        size = %winner.size,
                        color = %winner.color,
                        "image found"
                    );
                    records[slot].enrich(winner.url, winner.size, winner.color);
                    summary.found += 1;
                    dirty = true;
                    self.persist(records, &mut summary, &mut dirty)?;
                    tracing::info!(index, found = summary.found, total, "dataset updated");
                }
                SearchOutcome::Miss => {
                    summary.lost += 1;
                    tracing::warn!(
                        index,
                        record = %query,
                        lost = summary.lost,
                        total,
                        "no image found"
                    );
                }
                SearchOutcome::Interrupted => {
                    return self.interrupt(records, summary, dirty);
                }
            }
            summary.processed += 1;
            summary.last_index = index;
        }

        if dirty {
            self.persist(records, &mut summary, &mut dirty)?;
        }
        self.state = PipelineState::Done;
        tracing::info!(
            found = summary.found,
            lost = summary.lost,
            last_index = summary.last_index,
            writes = summary.writes,
            "enrichment run finished"
        );
        Ok(summary)
    }

    /// Walk the provider's candidates until one passes the resolution gate
    /// and has a color.
    fn find_winner(&mut self, query: &CarQuery, index: usize) -> SearchOutcome {
        self.state = PipelineState::Searching(index);
        let candidates = self
            .provider
            .find_candidates(query, self.options.max_candidates);
        for candidate in candidates {
            if self.cancel.is_cancelled() {
                return SearchOutcome::Interrupted;
            }
            self.state = PipelineState::Validating(index);
            let size = match self.inspector.fetch_dimensions(&candidate.url) {
                Ok(size) => size,
                Err(err) => {
                    tracing::debug!(index, url = %candidate.url, error = %err, "candidate fetch failed");
                    continue;
                }
            };
            if !meets_resolution(size.width, size.height) {
                tracing::debug!(index, url = %candidate.url, size = %size, "candidate below resolution");
                continue;
            }
            let color = match self.inspector.dominant_color(&candidate.url) {
                Ok(color) => color,
                Err(err) => {
                    tracing::debug!(index, url = %candidate.url, error = %err, "candidate color failed");
                    continue;
                }
            };
            return SearchOutcome::Winner(Winner {
                url: candidate.url,
                size,
                color,
            });
        }
        SearchOutcome::Miss
    }

    fn backfill_color(
        &mut self,
        records: &mut [CarRecord],
        slot: usize,
        index: usize,
        summary: &mut RunSummary,
        dirty: &mut bool,
    ) -> Result<(), RunError> {
        let Some(url) = records[slot].image_url.clone() else {
            return Ok(());
        };
        self.state = PipelineState::Validating(index);
        match self.inspector.dominant_color(&url) {
            Ok(color) => {
                tracing::info!(index, url = %url, color = %color, "color backfilled");
                records[slot].car_color = Some(color);
                summary.backfilled += 1;
                *dirty = true;
                self.state = PipelineState::Writing(index);
                self.persist(records, summary, dirty)
            }
            Err(err) => {
                tracing::warn!(index, url = %url, error = %err, "color backfill failed");
                Ok(())
            }
        }
    }

    fn persist(
        &mut self,
        records: &[CarRecord],
        summary: &mut RunSummary,
        dirty: &mut bool,
    ) -> Result<(), RunError> {
        self.store.replace(records)?;
        summary.writes += 1;
        *dirty = false;
        Ok(())
    }

    fn interrupt(
        &mut self,
        records: &[CarRecord],
        mut summary: RunSummary,
        mut dirty: bool,
    ) -> Result<RunSummary, RunError> {
        tracing::warn!(
            last_index = summary.last_index,
            "interrupted, saving progress before exit"
        );
        if dirty {
            self.persist(records, &mut summary, &mut dirty)?;
        }
        summary.status = RunStatus::Interrupted;
        self.state = PipelineState::Interrupted;
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
