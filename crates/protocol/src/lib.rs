pub mod constants;
pub mod error;
pub mod reason_codes;
pub mod types;
