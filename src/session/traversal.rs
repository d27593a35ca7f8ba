//! The cyclic frontier traversal loop (spec §4.3, §4.3.1, §4.3.2).

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::ProcessError;
use crate::events::SessionEvent;
use crate::guard::ProcessorGuard;
use crate::model::{CrawlingContext, CrawlingInput, Output, Source, StoredOutput};
use crate::processor::InputProcessor;
use crate::throttle::Throttler;

use super::Session;

/// One pending traversal item: the depth at which it will be processed,
/// and the raw input itself.
struct FrontierItem {
    depth: u32,
    input: CrawlingInput,
}

pub(super) async fn run(session: &Arc<Session>) {
    let start_time_ms = now_ms();
    let config = Arc::clone(&session.config);

    let mut frontier = config.traversal_algorithm.build::<FrontierItem>();
    for raw in &config.initial_inputs {
        match CrawlingInput::new(Source::root(), raw.clone()) {
            Ok(input) => frontier.add(FrontierItem { depth: 0, input }),
            Err(e) => {
                // Construction-time validation on the dispatcher/session
                // boundary should have already rejected blank seeds; a
                // blank seed reaching here is logged and skipped rather
                // than failing the whole session.
                warn!(session_id = %session.id(), error = %e, "skipping invalid seed");
            }
        }
    }

    let mut context = CrawlingContext::new();
    let guard = Arc::new(ProcessorGuard::new());

    let outcome = drive(session, &config, &mut *frontier, &mut context, &guard).await;

    let end_time_ms = now_ms();
    let duration = Duration::from_millis((end_time_ms - start_time_ms).max(0) as u64);

    match outcome {
        Ok(()) => {
            let result = crate::model::CrawlingResult::new(
                config.initial_inputs.clone(),
                context,
                start_time_ms,
                end_time_ms,
            );
            match config.store.save(result).await {
                Ok(result_id) => {
                    info!(session_id = %session.id(), %result_id, "session finished");
                    session.emit(SessionEvent::Finished {
                        session_id: session.id().to_string(),
                        initial_inputs: config.initial_inputs.clone(),
                        result_id,
                        duration,
                    });
                }
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "result store save failed");
                    session.emit(SessionEvent::Failed {
                        session_id: session.id().to_string(),
                        initial_inputs: config.initial_inputs.clone(),
                        error: e.into(),
                        duration,
                    });
                }
            }
        }
        Err(error) => {
            warn!(session_id = %session.id(), %error, "session failed");
            session.emit(SessionEvent::Failed {
                session_id: session.id().to_string(),
                initial_inputs: config.initial_inputs.clone(),
                error,
                duration,
            });
        }
    }
}

/// Drives the loop to completion or to an uncaught error. Any error
/// returned here aborts the session with `SessionFailed` (spec §4.3,
/// §7): this traversal loop itself cannot fail under normal operation,
/// since processor/guard errors are absorbed at the per-processor level,
/// but the signature keeps room for future traversal-level invariants.
async fn drive(
    session: &Arc<Session>,
    config: &Arc<super::SessionConfig>,
    frontier: &mut dyn crate::frontier::Frontier<FrontierItem>,
    context: &mut CrawlingContext,
    guard: &Arc<ProcessorGuard>,
) -> Result<(), crate::error::SessionError> {
    while !frontier.is_empty() {
        if session.is_destroyed() {
            break;
        }

        let batch = frontier
            .remove_batch(config.batch_size as i64)
            .expect("batch_size is validated non-negative at construction");

        let item_futures = batch.into_iter().map(|item| {
            let processors = config.processors.clone();
            let throttler = Arc::clone(&config.throttler);
            let guard = Arc::clone(guard);
            let context_snapshot = Arc::new(context.clone());
            let depth = item.depth;
            let input = item.input;

            tokio::spawn(async move {
                let outputs = process_item(&input, depth, &processors, &context_snapshot, &guard, &throttler).await;
                (depth + 1, outputs)
            })
        });

        let batch_results = join_all(item_futures).await;

        for joined in batch_results {
            let (output_depth, outputs) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "item sub-task panicked");
                    continue;
                }
            };

            for output in outputs {
                let crawlable_values: Vec<(Source, String)> = if output_depth < config.max_crawl_depth {
                    output
                        .data
                        .iter()
                        .flat_map(|record| record.iter())
                        .filter(|(_, holder)| holder.crawlable)
                        .map(|(_, holder)| (output.source.clone(), holder.value.clone()))
                        .collect()
                } else {
                    Vec::new()
                };

                let stored: StoredOutput = output.into();
                context.commit(stored);

                for (source, value) in crawlable_values {
                    match CrawlingInput::new(source, value) {
                        Ok(input) => frontier.add(FrontierItem {
                            depth: output_depth,
                            input,
                        }),
                        Err(_) => {
                            // Blank crawlable value: nothing useful to re-feed.
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Tries every registered processor against one item's input, in
/// parallel, tolerating individual processor failures (spec §4.3.2).
async fn process_item(
    input: &CrawlingInput,
    depth: u32,
    processors: &[Arc<dyn InputProcessor>],
    context: &Arc<CrawlingContext>,
    guard: &Arc<ProcessorGuard>,
    throttler: &Arc<dyn Throttler>,
) -> Vec<Output> {
    let _ = depth; // depth is threaded by the caller, kept for readability at call sites.

    let processor_futures = processors.iter().cloned().map(|processor| {
        let input = input.clone();
        let context = Arc::clone(context);
        let guard = Arc::clone(guard);
        let throttler = Arc::clone(throttler);

        tokio::spawn(async move { invoke_processor(processor, input, context, guard, throttler).await })
    });

    let results = join_all(processor_futures).await;

    results
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(Some(output)) => Some(output),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "processor sub-task panicked");
                None
            }
        })
        .collect()
}

/// Implements the per-(processor, input) invocation protocol in spec
/// §4.3.1. The guard slot is claimed atomically up front, before
/// `can_process`/`process` run at all: this is what makes "process(p, r)
/// invoked at most once" hold even when two processors discover the same
/// raw input in the same batch and both spawn a task for `r` before
/// either has run. A panic anywhere past the claim is caught by the
/// caller's `tokio::spawn` boundary and treated like an absorbed
/// processor error; the slot stays claimed either way, so a panicking or
/// `can_process`-false attempt is not retried within this session.
async fn invoke_processor(
    processor: Arc<dyn InputProcessor>,
    input: CrawlingInput,
    context: Arc<CrawlingContext>,
    guard: Arc<ProcessorGuard>,
    throttler: Arc<dyn Throttler>,
) -> Option<Output> {
    let processor_id = processor.processor_id();

    if !guard.try_claim(processor_id, &input.raw_input) {
        return None;
    }

    let can_process = processor.can_process(&input, &context).await;
    if !can_process {
        return None;
    }

    throttler.throttle(processor_id).await;

    let result = processor.process(&input, &context).await;

    match result {
        Ok(output) => Some(output),
        Err(ProcessError(msg)) => {
            let processor_name = processor.source().name;
            warn!(
                processor = %processor_name,
                input = %input.raw_input,
                error = %msg,
                "processor failed"
            );
            None
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
