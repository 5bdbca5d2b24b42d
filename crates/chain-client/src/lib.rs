pub mod crypto {
    pub use poolwatch_crypto::*;
}

pub mod error {
    pub use poolwatch_protocol::error::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

mod directory;
mod ledger;
mod miner;
mod oracle;

pub use directory::{DirectorySnapshot, WorkerDirectory, extract_address};
pub use ledger::{HttpLedgerClient, LedgerClient, SignedVote};
pub use miner::{
    FetchParams, FetchRequest, HEADER_SIGNATURE, HEADER_TIMESTAMP, HEADER_VALIDATOR_KEY,
    HttpMinerClient, MinerClient,
};
pub use oracle::{GroundTruthOracle, HttpOracleClient};
