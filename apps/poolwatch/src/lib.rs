pub mod control {
    pub use poolwatch_control_plane::control::*;
}

pub mod settings {
    pub use poolwatch_control_plane::settings::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

pub mod constants {
    pub use poolwatch_protocol::constants::*;
}

pub mod error {
    pub use poolwatch_protocol::error::*;
}

pub mod reason_codes {
    pub use poolwatch_protocol::reason_codes::*;
}

pub mod crypto {
    pub use poolwatch_crypto::*;
}

pub mod ledger {
    pub use poolwatch_task_ledger::*;
}

pub mod storage {
    pub use poolwatch_storage_core::*;
}

pub mod chain {
    pub use poolwatch_chain_client::*;
}

pub mod policy {
    pub use poolwatch_policy_engine::*;
}

pub mod validator {
    pub use poolwatch_validator_core::*;
}

#[path = "../../cli/cli.rs"]
pub mod cli;
