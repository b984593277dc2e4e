//! Concurrent fetch scheduler and ordered streaming assembler
//!
//! Pages are fetched by a bounded pool of workers and complete in arbitrary
//! order; the assembler is the sole owner of the ready buffer and the write
//! cursor, and releases a contiguous prefix to the sink as soon as it exists.
//! Memory stays flat regardless of page count: a worker may not dispatch a
//! fetch until a lookahead slot is free, and the slot is only freed when its
//! page has been committed to the sink. Any permanent fetch failure cancels
//! the whole job; in-flight request futures are dropped, not awaited.

use crate::error::{Error, Result};
use crate::fetch::PageFetcher;
use crate::governor::WorkerPlan;
use crate::sink::PageSink;
use crate::types::PageRef;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// One worker's report for one page. Produced exactly once per page,
/// consumed exactly once by the assembler.
struct PageOutcome {
    number: u32,
    result: std::result::Result<Vec<u8>, crate::error::FetchError>,
    /// Lookahead slot held since dispatch; dropped when the page is written
    /// (or the job aborts), which is what un-pauses dispatch.
    permit: OwnedSemaphorePermit,
}

/// Fetch `pages` concurrently and write them to `sink` in ascending page
/// order.
///
/// `pages` must be a contiguous ascending run; the cursor starts at the
/// first page's number. Returns once every page has been committed, or with
/// the first fatal error. On error nothing further is written and the sink
/// is left unfinalized.
pub async fn assemble<S: PageSink>(
    fetcher: Arc<dyn PageFetcher>,
    pages: Vec<PageRef>,
    plan: WorkerPlan,
    sink: &mut S,
) -> Result<()> {
    let total = pages.len();
    let Some(first) = pages.first() else {
        return Ok(());
    };
    let mut next_to_write = first.number;

    let workers = plan.workers.min(total).max(1);
    let window = Arc::new(Semaphore::new(plan.lookahead));
    let cancel = CancellationToken::new();
    let next_index = Arc::new(AtomicUsize::new(0));
    let pages = Arc::new(pages);
    let (tx, mut rx) = mpsc::channel::<PageOutcome>(workers);

    tracing::debug!(
        total_pages = total,
        workers,
        lookahead = plan.lookahead,
        "starting fetch pipeline"
    );

    for _ in 0..workers {
        let fetcher = Arc::clone(&fetcher);
        let pages = Arc::clone(&pages);
        let window = Arc::clone(&window);
        let cancel = cancel.clone();
        let next_index = Arc::clone(&next_index);
        let tx = tx.clone();

        tokio::spawn(async move {
            loop {
                // Backpressure: claim a lookahead slot before claiming work,
                // so pages are dispatched in order as slots free up.
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    permit = Arc::clone(&window).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let index = next_index.fetch_add(1, Ordering::SeqCst);
                let Some(page) = pages.get(index).cloned() else {
                    break;
                };

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = fetcher.fetch(&page) => result,
                };

                let outcome = PageOutcome {
                    number: page.number,
                    result,
                    permit,
                };
                if tx.send(outcome).await.is_err() {
                    // Assembler is gone; the job is over
                    break;
                }
            }
        });
    }
    drop(tx);

    // Assembler: sole owner of the ready buffer and the cursor. Keys in the
    // buffer are always in [next_to_write, next_to_write + lookahead).
    let mut ready: BTreeMap<u32, (Vec<u8>, OwnedSemaphorePermit)> = BTreeMap::new();
    let mut written = 0usize;

    while written < total {
        let Some(outcome) = rx.recv().await else {
            cancel.cancel();
            return Err(Error::Stalled { page: next_to_write });
        };

        let payload = match outcome.result {
            Ok(payload) => payload,
            Err(cause) => {
                tracing::error!(page = outcome.number, error = %cause, "page fetch failed, aborting job");
                cancel.cancel();
                return Err(Error::FetchFailed {
                    page: outcome.number,
                    cause,
                });
            }
        };

        ready.insert(outcome.number, (payload, outcome.permit));

        // Drain the contiguous prefix; dropping each permit as its page is
        // committed un-pauses one pending dispatch.
        while let Some((payload, permit)) = ready.remove(&next_to_write) {
            if let Err(e) = sink.add_page(next_to_write, &payload) {
                cancel.cancel();
                return Err(e);
            }
            drop(permit);
            next_to_write += 1;
            written += 1;
        }
    }

    cancel.cancel();
    tracing::debug!(total_pages = total, "fetch pipeline drained");
    Ok(())
}
