//! Configuration types for book-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP fetch behavior (timeouts, identification, pool sizing)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-attempt request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    ///
    /// Defaults to a desktop browser string; some book viewers refuse
    /// requests from obvious non-browser clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Hard upper bound on concurrent fetch workers (default: 16)
    ///
    /// The effective worker count is computed per job by the governor and
    /// never exceeds this value.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            max_workers: default_max_workers(),
        }
    }
}

/// Memory bounding for the fetch/assemble pipeline
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Memory budget in bytes for in-flight page payloads (None = unbounded)
    ///
    /// When set, page 1 is probe-fetched first and its payload size drives
    /// the worker count so the pipeline fits inside this budget.
    #[serde(default)]
    pub budget_bytes: Option<u64>,

    /// Maximum completed-but-unwritten pages the reassembler may hold
    /// before pausing new fetch dispatch (default: 32)
    ///
    /// This is the bound that keeps memory flat regardless of page count
    /// when workers race ahead of the writer. Effective fetch concurrency is
    /// `min(workers, lookahead)`.
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            budget_bytes: None,
            lookahead: default_lookahead(),
        }
    }
}

/// Retry configuration for transient fetch failures
///
/// A first-class policy value: the retryable status set lives here rather
/// than being buried in transport adapter configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to retry delays to prevent thundering herd (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// HTTP statuses treated as transient and retried
    /// (default: 429, 500, 502, 503, 504)
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl RetryConfig {
    /// Whether `status` is in the configured transient set.
    #[must_use]
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Main configuration for [`BookDownloader`](crate::BookDownloader)
///
/// All fields have sensible defaults; `Config::default()` works out of the
/// box against a well-behaved server with no memory constraint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Memory bounding (budget and lookahead)
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Retry policy for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/90 Safari/537.36"
        .to_string()
}

fn default_max_workers() -> usize {
    16
}

fn default_lookahead() -> usize {
    32
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
