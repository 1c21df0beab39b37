//! Top-level module for the Markov chain generation system.
//!
//! This module provides a word-level Markov chain text generator, including:
//! - The chain itself (`Chain`): ingestion, generation, merging, persistence
//! - Internal sliding-window key management (`Prefix`)

/// Fixed-order Markov chain over words.
///
/// Handles text ingestion, weighted random generation, merging,
/// and binary save/load of chain state.
pub mod chain;

/// Internal representation of the sliding lookup window.
///
/// Holds the last `order` words seen and produces the string key
/// used for chain lookups. This module is not exposed publicly.
mod prefix;
