//! core
//!
//! Shared domain types and configuration for finderz.
//!
//! # Modules
//!
//! - [`types`] - Strong types: FourCC, AttrKey
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod types;
