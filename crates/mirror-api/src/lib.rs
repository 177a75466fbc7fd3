//! Mirror API Library
//!
//! HTTP handlers and application setup over the mirror services.

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
