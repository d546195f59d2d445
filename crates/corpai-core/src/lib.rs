//! # Corporate AI Core
//!
//! Shared, WASM-safe logic for the Corporate AI client: the
//! newline-delimited JSON stream framer, the training-pipeline dashboard
//! reducer, the chat query state machine, and the audit-log model.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Everything here is driven by plain values
//! (byte chunks, parsed responses) so the same rules apply whether the
//! bytes arrive from a terminal client or a browser.

pub mod audit;
pub mod chat;
pub mod models;
pub mod ndjson;
pub mod pipeline;
