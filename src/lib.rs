//! Purpose: Shared library crate used by the `noticeboard` CLI and host embeddings.
//! Exports: `api` (public surface), `core` (lifecycle, persistence, errors).
//! Role: Flash/sticky operator notifications with per-user suppression.
//! Invariants: Core modules prefer explicit injected state over ambient globals.
//! Invariants: Nothing in this crate is fatal to a host process.
pub mod api;
pub mod core;
pub mod store_paths;
