//! Shared Module
//!
//! Lock-guarded public surface of the cache and the process-wide instance.

pub mod global;
mod handle;

pub use handle::MemoCache;
