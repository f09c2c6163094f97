// Core modules implementing the message lifecycle, persistence, and error modeling.
pub mod blob;
pub mod error;
pub mod message;
pub mod queue;
pub mod service;
pub mod sticky;
pub mod suppress;
