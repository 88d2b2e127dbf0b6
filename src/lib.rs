pub mod config;
pub mod download;
pub mod error;
pub mod provision;
pub mod registry;
pub mod select;
pub mod session;

pub use error::{NetworkError, PullError, Result};
