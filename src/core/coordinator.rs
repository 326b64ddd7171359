//! Concurrent chunk retrieval
//!
//! One tokio task per planned chunk. The first failure cancels the shared
//! token; every other unit either finishes (its result is thrown away) or
//! notices the cancellation and drops its in-flight request. Results are kept
//! in one slot per sequence index, so completion order never matters.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::error::{Error, Result};
use crate::core::fetch::{ChunkFetcher, ChunkResult};
use crate::core::plan::ChunkTask;

/// What a unit reports back: a result, or `None` if it stood down after cancellation
type UnitOutcome = (u32, Result<Option<ChunkResult>>);

/// Runs all chunk fetches of one download concurrently
pub struct Coordinator {
    fetcher: Arc<ChunkFetcher>,
    scratch_dir: PathBuf,
}

impl Coordinator {
    pub fn new(fetcher: ChunkFetcher, scratch_dir: PathBuf) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            scratch_dir,
        }
    }

    /// Fetches every task and returns the results ordered by sequence index.
    ///
    /// On failure the first observed error is returned, after all units have
    /// settled and every sink produced so far has been deleted.
    pub async fn run(&self, tasks: &[ChunkTask]) -> Result<Vec<ChunkResult>> {
        let token = CancellationToken::new();
        let mut units: JoinSet<UnitOutcome> = JoinSet::new();

        for task in tasks.iter().copied() {
            let fetcher = Arc::clone(&self.fetcher);
            let scratch_dir = self.scratch_dir.clone();
            let token = token.clone();

            units.spawn(async move {
                let index = task.sequence_index;
                if token.is_cancelled() {
                    return (index, Ok(None));
                }

                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => Ok(None),
                    result = fetcher.fetch_into_sink(task, &scratch_dir) => result.map(Some),
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ChunkResult>> = (0..tasks.len()).map(|_| None).collect();
        let mut failure = FirstFailure::new(token);

        while let Some(joined) = units.join_next().await {
            settle(&mut slots, &mut failure, joined);
        }

        if let Some(err) = failure.into_error() {
            // Dropping the slots deletes every sink that was produced
            drop(slots);
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Error::InvariantError(format!("chunk {index} finished without a result"))
                })
            })
            .collect()
    }
}

/// Folds one finished unit into the slots or the failure cell
fn settle(
    slots: &mut [Option<ChunkResult>],
    failure: &mut FirstFailure,
    joined: std::result::Result<UnitOutcome, JoinError>,
) {
    match joined {
        Ok((index, Ok(Some(result)))) => {
            if failure.is_set() {
                debug!("Chunk {index}: completed after cancellation, discarding");
                return;
            }
            if let Err(err) = store(slots, result) {
                failure.record(err);
            }
        }
        Ok((index, Ok(None))) => {
            debug!("Chunk {index}: cancelled");
        }
        Ok((index, Err(err))) => {
            failure.record(err.in_chunk(index));
        }
        Err(join_err) => {
            failure.record(Error::InvariantError(format!(
                "chunk task did not complete: {join_err}"
            )));
        }
    }
}

/// Places a result in its slot; each slot is written at most once
fn store(slots: &mut [Option<ChunkResult>], result: ChunkResult) -> Result<()> {
    let index = result.sequence_index;
    let planned = slots.len();
    let Some(slot) = slots.get_mut(index as usize) else {
        return Err(Error::InvariantError(format!(
            "chunk {index} is outside the plan of {planned} chunks"
        )));
    };
    if slot.is_some() {
        return Err(Error::InvariantError(format!(
            "chunk {index} produced more than one result"
        )));
    }
    *slot = Some(result);
    Ok(())
}

/// Single-writer cell for the error that aborts the batch
struct FirstFailure {
    token: CancellationToken,
    first: Option<Error>,
    suppressed: usize,
}

impl FirstFailure {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            first: None,
            suppressed: 0,
        }
    }

    fn is_set(&self) -> bool {
        self.first.is_some()
    }

    fn record(&mut self, err: Error) {
        if self.first.is_none() {
            debug!("Cancelling remaining chunks after: {err}");
            self.first = Some(err);
            self.token.cancel();
        } else {
            self.suppressed += 1;
            warn!("Suppressed additional chunk failure: {err}");
        }
    }

    fn into_error(self) -> Option<Error> {
        if self.suppressed > 0 {
            warn!("{} further chunk failure(s) suppressed", self.suppressed);
        }
        self.first
    }
}
