//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `progression` - Weekly content unlocking: weeks, pointers, completions,
//!   unlock policies and the derived roadmap

pub mod foundation;
pub mod progression;
