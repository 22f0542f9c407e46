//! # gatekeeper-common
//!
//! Shared types, configuration, error handling, and utilities used across all Gatekeeper crates.
//! This is the foundation layer: no verification logic, just primitives and contracts.

pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod validation;
