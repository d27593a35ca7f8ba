//! Core data model: sources, inputs, outputs, context, and results.
//!
//! See spec §3. `CrawlingContext` accumulates `StoredOutput`s in commit
//! order for the lifetime of one session; `CrawlingResult` is the
//! immutable snapshot handed to a result store when the session finishes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CrawlEngineError;

/// Stable identity of the component that produced a value: either a
/// registered `InputProcessor` or the synthetic root used for seeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub id: String,
}

impl Source {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// The synthetic source assigned to every seed at depth 0.
    pub fn root() -> Self {
        Self::new("root", "root")
    }
}

/// A raw value entering the frontier, tagged with the source that produced
/// it (or the root source, for seeds).
#[derive(Debug, Clone)]
pub struct CrawlingInput {
    pub source: Source,
    pub raw_input: String,
}

impl CrawlingInput {
    /// Trims `raw_input` and rejects it if blank, per the invariant that
    /// every `CrawlingInput` carries a non-blank raw input.
    pub fn new(source: Source, raw_input: impl Into<String>) -> Result<Self, CrawlEngineError> {
        let trimmed = raw_input.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(CrawlEngineError::usage("raw input must not be blank"));
        }
        Ok(Self {
            source,
            raw_input: trimmed,
        })
    }
}

/// A single produced value, tagged with whether the engine should re-feed
/// it into the frontier.
#[derive(Debug, Clone)]
pub struct ValueHolder {
    pub value: String,
    pub crawlable: bool,
}

impl ValueHolder {
    pub fn crawlable(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            crawlable: true,
        }
    }

    pub fn uncrawlable(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            crawlable: false,
        }
    }
}

/// One record within an `Output`: an ordered mapping of property key to
/// value. Ordering is preserved via `Vec` rather than a `HashMap`.
pub type OutputRecord = Vec<(String, ValueHolder)>;

/// The result of one successful `InputProcessor::process` call.
#[derive(Debug, Clone)]
pub struct Output {
    pub source: Source,
    pub started_by: Source,
    pub input: String,
    pub data: Vec<OutputRecord>,
    pub timestamp_ms: i64,
}

/// A `Record` where values have been flattened to plain strings; stored in
/// a `CrawlingContext` once crawlability has been consumed by the engine
/// for frontier routing.
pub type StoredRecord = Vec<(String, String)>;

/// An `Output` as held by the session's context: crawlability has already
/// been used to decide what gets re-enqueued, so only plain values remain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOutput {
    pub source: Source,
    pub started_by: Source,
    pub input: String,
    pub data: Vec<StoredRecord>,
    pub timestamp_ms: i64,
}

impl From<Output> for StoredOutput {
    fn from(output: Output) -> Self {
        let data = output
            .data
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(key, holder)| (key, holder.value))
                    .collect::<StoredRecord>()
            })
            .collect();
        Self {
            source: output.source,
            started_by: output.started_by,
            input: output.input,
            data,
            timestamp_ms: output.timestamp_ms,
        }
    }
}

/// Ordered accumulation of `StoredOutput`s for one session. Mutated only
/// by the session's own coordination task, after a batch completes;
/// exposed to processors as a read-only view.
#[derive(Debug, Clone, Default)]
pub struct CrawlingContext {
    outputs: Vec<StoredOutput>,
}

impl CrawlingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a commit at the end, preserving insertion order.
    pub fn commit(&mut self, output: StoredOutput) {
        self.outputs.push(output);
    }

    /// All stored outputs, in commit order.
    pub fn all(&self) -> &[StoredOutput] {
        &self.outputs
    }

    /// Outputs produced by the source with the given id.
    pub fn by_source_id<'a>(&'a self, source_id: &str) -> impl Iterator<Item = &'a StoredOutput> {
        self.outputs.iter().filter(move |o| o.source.id == source_id)
    }

    /// Outputs produced by sources with the given name.
    pub fn by_source_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a StoredOutput> {
        self.outputs.iter().filter(move |o| o.source.name == name)
    }

    /// All values stored under `key`, across all records of all outputs,
    /// concatenated in insertion order.
    pub fn values_for_key(&self, key: &str) -> Vec<String> {
        self.outputs
            .iter()
            .flat_map(|o| o.data.iter())
            .flat_map(|record| record.iter())
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Immutable snapshot produced once at session end and handed to the
/// result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlingResult {
    pub initial_inputs: Vec<String>,
    pub outputs: Vec<StoredOutput>,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl CrawlingResult {
    pub fn new(
        initial_inputs: Vec<String>,
        context: CrawlingContext,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> Self {
        Self {
            initial_inputs,
            outputs: context.outputs,
            start_time_ms,
            end_time_ms,
        }
    }
}

/// Reference JSON shape documented in spec §6.2, used by
/// `JsonFileResultStore`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlingResultJson {
    #[serde(rename = "initialInputs")]
    pub initial_inputs: Vec<String>,
    pub outputs: Vec<CrawlingOutputJson>,
    #[serde(rename = "crawlingStartTimeMs")]
    pub crawling_start_time_ms: i64,
    #[serde(rename = "crawlingEndTimeMs")]
    pub crawling_end_time_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlingOutputJson {
    pub source: Source,
    #[serde(rename = "startedBy")]
    pub started_by: Source,
    pub input: String,
    pub data: Vec<HashMap<String, String>>,
    pub timestamp: i64,
}

impl From<&CrawlingResult> for CrawlingResultJson {
    fn from(result: &CrawlingResult) -> Self {
        Self {
            initial_inputs: result.initial_inputs.clone(),
            outputs: result
                .outputs
                .iter()
                .map(|o| CrawlingOutputJson {
                    source: o.source.clone(),
                    started_by: o.started_by.clone(),
                    input: o.input.clone(),
                    data: o
                        .data
                        .iter()
                        .map(|record| record.iter().cloned().collect())
                        .collect(),
                    timestamp: o.timestamp_ms,
                })
                .collect(),
            crawling_start_time_ms: result.start_time_ms,
            crawling_end_time_ms: result.end_time_ms,
        }
    }
}
