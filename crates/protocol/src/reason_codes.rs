pub const REASON_UNKNOWN: u16 = 0;
pub const REASON_COMMITTED: u16 = 100;
pub const REASON_NO_WORK: u16 = 101;
pub const REASON_WINDOW_NOT_CLOSED: u16 = 102;
pub const REASON_NO_WORKERS: u16 = 103;
pub const REASON_NO_QUORUM: u16 = 200;
pub const REASON_VERIFY_EMPTY_PAYLOAD: u16 = 201;
pub const REASON_VERIFY_BLOCK_OUT_OF_RANGE: u16 = 202;
pub const REASON_VERIFY_HASH_MISMATCH: u16 = 203;
pub const REASON_NO_POSITIVE_SCORES: u16 = 300;
pub const REASON_WORKER_TIMEOUT: u16 = 400;
pub const REASON_WORKER_TRANSPORT: u16 = 401;
pub const REASON_WORKER_MALFORMED: u16 = 402;

pub const REASON_CODE_TABLE: &[(u16, &str, &str)] = &[
    (REASON_UNKNOWN, "UNKNOWN", "Unknown reason code"),
    (
        REASON_COMMITTED,
        "COMMITTED",
        "Vote submitted and tasks marked complete",
    ),
    (
        REASON_NO_WORK,
        "NO_WORK",
        "No dispatchable token pair within the hop budget",
    ),
    (
        REASON_WINDOW_NOT_CLOSED,
        "WINDOW_NOT_CLOSED",
        "Next window ends in the future",
    ),
    (
        REASON_NO_WORKERS,
        "NO_WORKERS",
        "No worker with a resolvable address and identity",
    ),
    (
        REASON_NO_QUORUM,
        "NO_QUORUM",
        "All answers were null or malformed",
    ),
    (
        REASON_VERIFY_EMPTY_PAYLOAD,
        "VERIFY_EMPTY_PAYLOAD",
        "Accepted answer carries no records to sample",
    ),
    (
        REASON_VERIFY_BLOCK_OUT_OF_RANGE,
        "VERIFY_BLOCK_OUT_OF_RANGE",
        "Sampled record lies outside the oracle block range",
    ),
    (
        REASON_VERIFY_HASH_MISMATCH,
        "VERIFY_HASH_MISMATCH",
        "Sampled record hash disagrees with the oracle",
    ),
    (
        REASON_NO_POSITIVE_SCORES,
        "NO_POSITIVE_SCORES",
        "No worker received a positive weight",
    ),
    (
        REASON_WORKER_TIMEOUT,
        "WORKER_TIMEOUT",
        "Worker call exceeded the per-call timeout",
    ),
    (
        REASON_WORKER_TRANSPORT,
        "WORKER_TRANSPORT",
        "Worker call failed at the transport layer",
    ),
    (
        REASON_WORKER_MALFORMED,
        "WORKER_MALFORMED",
        "Worker returned a payload that is not a well-formed answer",
    ),
];

pub fn reason_code_name(code: u16) -> &'static str {
    REASON_CODE_TABLE
        .iter()
        .find_map(|(c, name, _)| if *c == code { Some(*name) } else { None })
        .unwrap_or("UNKNOWN")
}

pub fn is_protocol_reason_code(code: u16) -> bool {
    REASON_CODE_TABLE.iter().any(|(c, _, _)| *c == code)
}
