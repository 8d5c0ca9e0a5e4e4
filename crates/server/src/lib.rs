//! ELSY API server library: HTTP surface, persistence and outbound integrations.
//! Everything here sits behind the `server` feature so `shared-types` consumers
//! can depend on the crate without pulling in the runtime stack.

// Runtime plumbing
#[cfg(feature = "server")]
pub mod config;

#[cfg(feature = "server")]
pub mod db;

#[cfg(feature = "server")]
pub mod error_convert;

#[cfg(feature = "server")]
pub mod telemetry;

#[cfg(feature = "server")]
pub mod rate_limit;

#[cfg(feature = "server")]
pub mod health;

// HTTP surface
#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "server")]
pub mod rest;

#[cfg(feature = "server")]
pub mod openapi;

// Data access and domain helpers
#[cfg(feature = "server")]
pub mod repo;

#[cfg(feature = "server")]
pub mod helpers;

// Outbound integrations
#[cfg(feature = "server")]
pub mod storage;

#[cfg(feature = "server")]
pub mod mailgun;

#[cfg(feature = "server")]
pub mod twilio;
