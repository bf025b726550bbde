//! Core of the ACC unlock tool: discovers reserved documents across a project's
//! folder hierarchy and releases them, reporting an outcome per file.
//! Remote access is abstracted behind the traits in [`remote`]; this crate has no HTTP dependency.

pub mod classify;
pub mod error;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod remote;
pub mod walker;
