//! Transport-agnostic JWT utilities shared by the web OAuth plugin and its
//! test helpers.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified header access, iat checks)
pub mod jwt;
