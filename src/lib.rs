// Library target exists for the integration tests and criterion benchmarks.
// The binary entry point is main.rs; this file re-declares the module tree so
// that harnesses can drive a session via `examroom::exam::*`.
// Presentation code is only exercised through the binary, so suppress dead_code warnings.
#![allow(dead_code)]

// Public: the exam controller and its persistence
pub mod config;
pub mod exam;
pub mod store;

// Private: required transitively by app (won't compile without them)
mod app;
mod event;
mod ui;
