//! Concurrency governor: sizes the fetch worker pool for the memory budget
//!
//! The governor runs once per job, after the probe fetch and before the main
//! fetch wave. Its output is advisory and is never revised downward once
//! workers are dispatched.

use crate::config::Config;
use crate::error::{Error, Result};

/// Bytes reserved out of the budget for non-payload overhead (runtime,
/// connection pool, PDF writer state).
pub const OVERHEAD_RESERVE_BYTES: u64 = 64 * 1024 * 1024;

/// Payload-sized buffers each in-flight worker may hold concurrently:
/// one being fetched plus one completed and awaiting its turn to be written.
pub const BUFFERS_PER_WORKER: u64 = 2;

/// Minimum worker count the governor will return when the budget admits any
/// workers at all. Below two workers the pipeline degenerates to sequential
/// fetching.
pub const MIN_WORKERS: usize = 2;

/// The per-job concurrency decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPlan {
    /// Effective fetch worker count, `MIN_WORKERS..=max_workers`
    pub workers: usize,
    /// Lookahead bound carried over from config (validated non-zero)
    pub lookahead: usize,
}

impl WorkerPlan {
    /// Compute the worker plan for one job.
    ///
    /// `probe_page_size` is the measured payload size of page 1 when a probe
    /// fetch was made. Without a budget or without a probe the full
    /// configured worker count is used.
    ///
    /// The count is monotone non-decreasing in the budget (holding the page
    /// size fixed) and never exceeds `config.fetch.max_workers`.
    pub fn compute(config: &Config, probe_page_size: Option<u64>) -> Result<Self> {
        let lookahead = config.memory.lookahead;
        if lookahead == 0 {
            return Err(Error::ResourceExhaustion {
                reason: "lookahead bound is zero, no page could ever be dispatched".into(),
            });
        }

        let max_workers = config.fetch.max_workers;
        if max_workers == 0 {
            return Err(Error::ResourceExhaustion {
                reason: "max_workers is zero, no fetch could ever run".into(),
            });
        }

        let workers = match (config.memory.budget_bytes, probe_page_size) {
            (Some(budget), Some(page_size)) => {
                let usable = budget.saturating_sub(OVERHEAD_RESERVE_BYTES);
                let per_worker = BUFFERS_PER_WORKER * page_size.max(1);
                let fit = usable / per_worker;
                if fit == 0 {
                    return Err(Error::ResourceExhaustion {
                        reason: format!(
                            "budget of {budget} bytes holds zero workers at {page_size} bytes per page"
                        ),
                    });
                }
                usize::try_from(fit)
                    .unwrap_or(usize::MAX)
                    .max(MIN_WORKERS)
                    .min(max_workers)
            }
            // No budget, or budget but no measurement: no memory constraint
            _ => max_workers,
        };

        tracing::debug!(
            workers,
            lookahead,
            budget_bytes = ?config.memory.budget_bytes,
            probe_page_size = ?probe_page_size,
            "computed worker plan"
        );

        Ok(Self { workers, lookahead })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config_with(budget: Option<u64>, max_workers: usize, lookahead: usize) -> Config {
        let mut config = Config::default();
        config.memory.budget_bytes = budget;
        config.memory.lookahead = lookahead;
        config.fetch.max_workers = max_workers;
        config
    }

    const MB: u64 = 1024 * 1024;

    #[test]
    fn no_budget_uses_full_worker_count() {
        let config = config_with(None, 16, 32);
        let plan = WorkerPlan::compute(&config, None).unwrap();
        assert_eq!(plan.workers, 16);
        assert_eq!(plan.lookahead, 32);
    }

    #[test]
    fn budget_without_probe_uses_full_worker_count() {
        let config = config_with(Some(512 * MB), 8, 32);
        let plan = WorkerPlan::compute(&config, None).unwrap();
        assert_eq!(plan.workers, 8);
    }

    #[test]
    fn tight_budget_yields_two_workers() {
        // Budget holds exactly two workers' worth of 50MB double buffers
        // beyond the fixed reserve.
        let budget = OVERHEAD_RESERVE_BYTES + 2 * BUFFERS_PER_WORKER * 50 * MB;
        let config = config_with(Some(budget), 16, 32);
        let plan = WorkerPlan::compute(&config, Some(50 * MB)).unwrap();
        assert_eq!(plan.workers, 2);
    }

    #[test]
    fn budget_fitting_one_worker_is_floored_to_min_workers() {
        let budget = OVERHEAD_RESERVE_BYTES + BUFFERS_PER_WORKER * 50 * MB;
        let config = config_with(Some(budget), 16, 32);
        let plan = WorkerPlan::compute(&config, Some(50 * MB)).unwrap();
        assert_eq!(plan.workers, MIN_WORKERS);
    }

    #[test]
    fn budget_fitting_zero_workers_is_resource_exhaustion() {
        let config = config_with(Some(OVERHEAD_RESERVE_BYTES + MB), 16, 32);
        let err = WorkerPlan::compute(&config, Some(50 * MB)).unwrap_err();
        assert!(matches!(err, Error::ResourceExhaustion { .. }), "got {err:?}");
    }

    #[test]
    fn budget_below_overhead_reserve_is_resource_exhaustion() {
        let config = config_with(Some(MB), 16, 32);
        let err = WorkerPlan::compute(&config, Some(100)).unwrap_err();
        assert!(matches!(err, Error::ResourceExhaustion { .. }));
    }

    #[test]
    fn zero_lookahead_is_resource_exhaustion_even_without_budget() {
        let config = config_with(None, 16, 0);
        let err = WorkerPlan::compute(&config, None).unwrap_err();
        assert!(matches!(err, Error::ResourceExhaustion { .. }));
    }

    #[test]
    fn zero_max_workers_is_resource_exhaustion() {
        let config = config_with(None, 0, 32);
        let err = WorkerPlan::compute(&config, None).unwrap_err();
        assert!(matches!(err, Error::ResourceExhaustion { .. }));
    }

    #[test]
    fn worker_count_never_exceeds_hard_upper_bound() {
        let config = config_with(Some(100_000 * MB), 6, 32);
        let plan = WorkerPlan::compute(&config, Some(MB)).unwrap();
        assert_eq!(plan.workers, 6);
    }

    #[test]
    fn worker_count_is_monotone_in_budget() {
        let page_size = 5 * MB;
        let mut previous = 0;
        for step in 0..200u64 {
            let budget = OVERHEAD_RESERVE_BYTES / 2 + step * 4 * MB;
            let config = config_with(Some(budget), 64, 32);
            let workers = match WorkerPlan::compute(&config, Some(page_size)) {
                Ok(plan) => plan.workers,
                // Too-tight budgets fail; treat as zero for monotonicity
                Err(Error::ResourceExhaustion { .. }) => 0,
                Err(e) => panic!("unexpected error: {e:?}"),
            };
            assert!(
                workers >= previous,
                "workers dropped from {previous} to {workers} as budget grew to {budget}"
            );
            assert!(workers <= 64);
            previous = workers;
        }
    }
}
