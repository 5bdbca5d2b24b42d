pub mod constants {
    pub use poolwatch_protocol::constants::*;
}

pub mod crypto {
    pub use poolwatch_crypto::*;
}

pub mod error {
    pub use poolwatch_protocol::error::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

pub mod control;
pub mod settings;
