//! Shared types for the volunteer console: the remote API's wire records,
//! the client used to reach it, configuration and telemetry.

pub mod client;
pub mod config;
pub mod error;
pub mod profile;
pub mod telemetry;

pub use crate::client::{HttpApi, LoginApi, ProfileApi};
pub use crate::config::{ApiConfig, Config};
pub use crate::error::{ApiError, ConfigError};
pub use crate::profile::{LoginRequest, LoginResponse, Profile, Role};
