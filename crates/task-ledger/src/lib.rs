pub mod error {
    pub use poolwatch_protocol::error::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

pub mod task_ledger;

pub use task_ledger::*;
