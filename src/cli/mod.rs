#![forbid(unsafe_code)]

//! Pipeline orchestration shared by the `linkclique` binary.
//!
//! Each entry point owns the store lifecycle for one subcommand: create or
//! open, ingest, seal, search, clean up.

/// Ingest, search and scratch-store handling.
pub mod pipeline;
