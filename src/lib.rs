//! Debounced SQL validation against a remote validation service.
//!
//! The [`coordinator`] collapses bursts of edits into single validation
//! requests, cancels superseded ones and only ever publishes the newest
//! settled result. Everything else is glue around it: the HTTP
//! [`service`] client, the pure [`projector`], and the terminal
//! [`render`]er and [`input`] sources used by the binary.

pub mod config;
pub mod coordinator;
pub mod input;
pub mod logging;
pub mod model;
pub mod projector;
pub mod render;
pub mod service;
pub mod shutdown;
