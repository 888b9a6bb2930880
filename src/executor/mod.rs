//! The batched, idempotent metadata-delete executor.

mod cleaner;
mod client;

pub use cleaner::*;
pub use client::*;
