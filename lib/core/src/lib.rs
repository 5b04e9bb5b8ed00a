//! Core domain types and utilities for authgate.
//!
//! This crate provides the identifiers and secret handling shared by the
//! credential, access and server crates.

pub mod id;
pub mod secret;

pub use id::{DeviceId, ParseIdError, SessionId, UserId};
pub use secret::Secret;
