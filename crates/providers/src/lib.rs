//! Model client implementations for ClawLoop.
//!
//! All clients implement `clawloop_core::ModelClient`. The loop asks for a
//! [`ModelTier`](clawloop_core::ModelTier); [`TierModels`] turns that into a
//! concrete model name for the configured backend.

pub mod openai_compat;
pub mod tiers;

pub use openai_compat::OpenAiCompatClient;
pub use tiers::TierModels;
