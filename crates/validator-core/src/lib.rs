pub mod chain {
    pub use poolwatch_chain_client::*;
}

pub mod constants {
    pub use poolwatch_protocol::constants::*;
}

pub mod crypto {
    pub use poolwatch_crypto::*;
}

pub mod error {
    pub use poolwatch_protocol::error::*;
}

pub mod ledger {
    pub use poolwatch_task_ledger::*;
}

pub mod policy {
    pub use poolwatch_policy_engine::*;
}

pub mod reason_codes {
    pub use poolwatch_protocol::reason_codes::*;
}

pub mod storage {
    pub use poolwatch_storage_core::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

pub mod validator;

pub use validator::*;
