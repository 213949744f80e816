//! Code execution session for the ByteForge compiler page.
//!
//! A `SessionController` sequences runs of user programs against a remote
//! execution service through an `ExecutionClient`, consulting an
//! `AuthProvider` before each run.

pub mod auth;
pub mod client;
pub mod controller;
pub mod error;
pub mod metrics;

pub use auth::{AuthProvider, StaticAuth, TokenAuth};
pub use client::{ExecutionClient, HttpExecutionClient, ProgramOutcome};
pub use controller::SessionController;
pub use error::{SessionError, TransportError};
