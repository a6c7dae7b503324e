//! pnb-core: Core abstractions and configuration for Pick N Brain
//!
//! This crate provides the shared types, clock and token abstractions,
//! configuration structures and error taxonomy used by the gateway.

pub mod config;
pub mod error;
pub mod time;
pub mod token;
pub mod types;

pub use error::{BackendError, ConfigError, PnbError, SessionError};
pub use time::{Clock, ManualClock, SystemClock};
pub use token::{RandomTokenSource, TokenSource};
pub use types::{ClientAddress, Operation, SessionToken};
