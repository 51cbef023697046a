//! Prep Track - Weekly content progression for exam preparation
//!
//! This crate decides which week of a study track each learner may open,
//! records their completions and advances them under per-track unlock
//! policies, exposing it all over a REST API.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
