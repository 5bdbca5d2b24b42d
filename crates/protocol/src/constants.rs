pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_CONCURRENCY: usize = 8;
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
pub const DEFAULT_MAX_ALLOWED_WEIGHTS: usize = 420;
pub const DEFAULT_ITERATION_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_WINDOW_DAYS: u32 = 1;
pub const DEFAULT_GENESIS_DATE: &str = "2021-05-05";

/// Total weight mass distributed across one vote.
pub const WEIGHT_SCALE: f64 = 1_000.0;

/// Score granted to a worker whose answer matches the accepted fingerprint.
pub const FLAT_AGREEMENT_SCORE: f64 = 0.9;

pub const JOB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Upper bound on windows skipped in one round when windows turn out to hold no work.
pub const MAX_WINDOW_HOPS_PER_ROUND: usize = 8;
