//! Cloudjar — declarative cloud stack composition.
//!
//! A stack is a typed resource graph. BLAKE3 plans, a per-stack lock,
//! secrets that never leave the secret store, provenance tracing.

pub mod cli;
pub mod core;
pub mod provider;
pub mod resources;
pub mod stack;
pub mod tripwire;
