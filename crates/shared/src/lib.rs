//! Shared utilities and common types for the gym scheduler backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic for request payloads

pub mod validation;
