//! # pusher-server
//!
//! Service layer behind the HTTP handlers: configuration, shared state and
//! one command function per endpoint.
//!
//! ## Modules
//!
//! - [`config`] - [`ServerConfig`], loaded from TOML with environment overrides
//! - [`state`] - [`ServerState`]: database handle, authenticator, query caches
//! - [`commands`] - upload, load, history and statistics commands
//! - [`error`] - [`ServiceError`], the error kinds the HTTP layer maps to
//!   status codes
//! - [`telemetry`] - tracing subscriber setup

pub mod commands;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServiceError};
pub use state::ServerState;
