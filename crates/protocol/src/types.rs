use crate::constants::JOB_DATETIME_FORMAT;
use crate::error::ValidatorError;
use crate::reason_codes::{
    REASON_COMMITTED, REASON_NO_POSITIVE_SCORES, REASON_NO_QUORUM, REASON_NO_WORK,
    REASON_NO_WORKERS, REASON_VERIFY_BLOCK_OUT_OF_RANGE, REASON_VERIFY_EMPTY_PAYLOAD,
    REASON_VERIFY_HASH_MISMATCH, REASON_WINDOW_NOT_CLOSED,
};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window of `days` length beginning at `start`; `None` on calendar overflow.
    pub fn starting_at(start: NaiveDate, days: u32) -> Option<Self> {
        let end = start.checked_add_days(Days::new(u64::from(days)))?;
        Some(Self { start, end })
    }

    /// The window that directly follows this one.
    pub fn next(&self, days: u32) -> Option<Self> {
        Self::starting_at(self.end, days)
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN)
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowTask {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub completed: bool,
}

impl TimeWindowTask {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

/// One liquidity pool: two asset identifiers plus a fee tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "token0")]
    pub token_a: String,
    #[serde(alias = "token1")]
    pub token_b: String,
    pub fee: u32,
}

impl TokenPair {
    pub fn new(token_a: impl Into<String>, token_b: impl Into<String>, fee: u32) -> Self {
        Self {
            token_a: token_a.into(),
            token_b: token_b.into(),
            fee,
        }
    }
}

impl Display for TokenPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.token_a, self.token_b, self.fee)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPairTask {
    #[serde(flatten)]
    pub pair: TokenPair,
    pub completed: bool,
}

/// The query sent to every worker in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub token_a: String,
    pub token_b: String,
    pub fee: u32,
    pub start_datetime: String,
    pub end_datetime: String,
}

impl JobDescription {
    pub fn new(pair: &TokenPair, window: &TimeWindow) -> Self {
        Self {
            token_a: pair.token_a.clone(),
            token_b: pair.token_b.clone(),
            fee: pair.fee,
            start_datetime: window
                .start_datetime()
                .format(JOB_DATETIME_FORMAT)
                .to_string(),
            end_datetime: window.end_datetime().format(JOB_DATETIME_FORMAT).to_string(),
        }
    }

    pub fn pair(&self) -> TokenPair {
        TokenPair::new(self.token_a.clone(), self.token_b.clone(), self.fee)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Swap,
    Mint,
    Burn,
    Collect,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Swap,
        EventKind::Mint,
        EventKind::Burn,
        EventKind::Collect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Swap => "swap",
            EventKind::Mint => "mint",
            EventKind::Burn => "burn",
            EventKind::Collect => "collect",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidatorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "swap" => Ok(EventKind::Swap),
            "mint" => Ok(EventKind::Mint),
            "burn" => Ok(EventKind::Burn),
            "collect" => Ok(EventKind::Collect),
            other => Err(ValidatorError::NotFound(format!("event kind {other}"))),
        }
    }
}

// Amounts, liquidity and prices are 256-bit on chain and travel as decimal strings.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub sender: String,
    pub to: String,
    pub amount0: String,
    pub amount1: String,
    pub sqrt_price_x96: String,
    pub liquidity: String,
    pub tick: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEvent {
    pub sender: String,
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: String,
    pub amount0: String,
    pub amount1: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnEvent {
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount: String,
    pub amount0: String,
    pub amount1: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectEvent {
    pub owner: String,
    pub recipient: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: String,
    pub amount1: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PoolEvent {
    Swap(SwapEvent),
    Mint(MintEvent),
    Burn(BurnEvent),
    Collect(CollectEvent),
}

impl PoolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PoolEvent::Swap(_) => EventKind::Swap,
            PoolEvent::Mint(_) => EventKind::Mint,
            PoolEvent::Burn(_) => EventKind::Burn,
            PoolEvent::Collect(_) => EventKind::Collect,
        }
    }

    fn decimal_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            PoolEvent::Swap(e) => vec![
                ("amount0", e.amount0.as_str()),
                ("amount1", e.amount1.as_str()),
                ("sqrt_price_x96", e.sqrt_price_x96.as_str()),
                ("liquidity", e.liquidity.as_str()),
            ],
            PoolEvent::Mint(e) => vec![
                ("amount", e.amount.as_str()),
                ("amount0", e.amount0.as_str()),
                ("amount1", e.amount1.as_str()),
            ],
            PoolEvent::Burn(e) => vec![
                ("amount", e.amount.as_str()),
                ("amount0", e.amount0.as_str()),
                ("amount1", e.amount1.as_str()),
            ],
            PoolEvent::Collect(e) => vec![
                ("amount0", e.amount0.as_str()),
                ("amount1", e.amount1.as_str()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEventRecord {
    pub block_number: u64,
    pub transaction_hash: String,
    pub hash: String,
    pub event: PoolEvent,
}

/// A worker's answer. `overall_hash` is self-reported and never recomputed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerAnswer {
    pub overall_hash: String,
    pub data: Vec<PoolEventRecord>,
}

impl MinerAnswer {
    /// Decode a raw worker payload. A payload delivered as a JSON-encoded string is
    /// unwrapped once before decoding.
    pub fn from_value(value: Value) -> Result<Self, ValidatorError> {
        let value = match value {
            Value::String(raw) => serde_json::from_str::<Value>(&raw)
                .map_err(|err| ValidatorError::MalformedAnswer(format!("inner json: {err}")))?,
            other => other,
        };
        let answer: MinerAnswer = serde_json::from_value(value)
            .map_err(|err| ValidatorError::MalformedAnswer(err.to_string()))?;
        answer.validate()?;
        Ok(answer)
    }

    pub fn validate(&self) -> Result<(), ValidatorError> {
        if self.overall_hash.trim().is_empty() {
            return Err(ValidatorError::MalformedAnswer(
                "overall_hash is empty".into(),
            ));
        }
        for (idx, record) in self.data.iter().enumerate() {
            for (field, raw) in record.event.decimal_fields() {
                if !is_decimal_integer(raw) {
                    return Err(ValidatorError::MalformedAnswer(format!(
                        "record {idx}: {field} is not a decimal integer: {raw:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Arbitrary-precision decimal integer: optional leading `-`, then ASCII digits.
pub fn is_decimal_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: u64,
    pub address: SocketAddr,
    pub identity_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn contains(&self, block_number: u64) -> bool {
        block_number >= self.start && block_number <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub hash: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationFailure {
    EmptyPayload,
    BlockOutOfRange { block_number: u64, range: BlockRange },
    HashMismatch {
        block_number: u64,
        reported: String,
        authoritative: String,
    },
}

impl VerificationFailure {
    pub fn reason_code(&self) -> u16 {
        match self {
            VerificationFailure::EmptyPayload => REASON_VERIFY_EMPTY_PAYLOAD,
            VerificationFailure::BlockOutOfRange { .. } => REASON_VERIFY_BLOCK_OUT_OF_RANGE,
            VerificationFailure::HashMismatch { .. } => REASON_VERIFY_HASH_MISMATCH,
        }
    }
}

impl Display for VerificationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationFailure::EmptyPayload => write!(f, "accepted answer has no records"),
            VerificationFailure::BlockOutOfRange {
                block_number,
                range,
            } => write!(
                f,
                "block {block_number} outside oracle range {}..={}",
                range.start, range.end
            ),
            VerificationFailure::HashMismatch {
                block_number,
                reported,
                authoritative,
            } => write!(
                f,
                "block {block_number} hash {reported} disagrees with oracle {authoritative}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    NoWork,
    WindowNotClosed { window: TimeWindow },
    NoWorkers,
    NoQuorum,
    VerificationFailed { failure: VerificationFailure },
    NoPositiveScores,
}

impl AbortReason {
    pub fn reason_code(&self) -> u16 {
        match self {
            AbortReason::NoWork => REASON_NO_WORK,
            AbortReason::WindowNotClosed { .. } => REASON_WINDOW_NOT_CLOSED,
            AbortReason::NoWorkers => REASON_NO_WORKERS,
            AbortReason::NoQuorum => REASON_NO_QUORUM,
            AbortReason::VerificationFailed { failure } => failure.reason_code(),
            AbortReason::NoPositiveScores => REASON_NO_POSITIVE_SCORES,
        }
    }
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::NoWork => write!(f, "no dispatchable work"),
            AbortReason::WindowNotClosed { window } => {
                write!(f, "window {window} has not closed yet")
            }
            AbortReason::NoWorkers => write!(f, "no eligible workers"),
            AbortReason::NoQuorum => write!(f, "no quorum among worker answers"),
            AbortReason::VerificationFailed { failure } => {
                write!(f, "verification failed: {failure}")
            }
            AbortReason::NoPositiveScores => write!(f, "no worker scored above zero"),
        }
    }
}

/// Parallel id/weight vectors submitted to the ledger as one vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightVote {
    pub uids: Vec<u64>,
    pub weights: Vec<u16>,
}

impl WeightVote {
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    pub fn total_weight(&self) -> u32 {
        self.weights.iter().map(|w| u32::from(*w)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundOutcome {
    Committed {
        fingerprint: String,
        vote: WeightVote,
        archived_events: usize,
    },
    Aborted { abort: AbortReason },
}

impl RoundOutcome {
    pub fn reason_code(&self) -> u16 {
        match self {
            RoundOutcome::Committed { .. } => REASON_COMMITTED,
            RoundOutcome::Aborted { abort } => abort.reason_code(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, RoundOutcome::Committed { .. })
    }
}

/// In-memory state of a single round. Discarded once the round ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    pub answers: BTreeMap<u64, Option<MinerAnswer>>,
    pub consensus_fingerprint: Option<String>,
    pub accepted: Option<MinerAnswer>,
    pub scores: BTreeMap<u64, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub window: Option<TimeWindow>,
    pub pair: Option<TokenPair>,
    pub workers_polled: usize,
    pub answers_received: usize,
    pub outcome: RoundOutcome,
}
