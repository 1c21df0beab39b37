//! Word-level Markov chain text generation library.
//!
//! This crate provides a fixed-order Markov chain over words including:
//! - A sliding-window prefix used as the lookup key
//! - A concurrent-safe chain with incremental ingestion and
//!   weighted random generation
//! - Binary persistence of chain state and parallel corpus loading
//! - Internal utilities for I/O and path handling
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core chain model and generation logic.
///
/// This module exposes the chain interface while keeping the
/// internal prefix representation private.
pub mod model;

/// I/O utilities (corpus reading, path helpers).
pub mod io;
