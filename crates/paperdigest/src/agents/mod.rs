//! The model-backed agents the pipeline is built from.
//!
//! Each agent is an async function taking a [`ModelCaller`](crate::api::ModelCaller)
//! and the [`ModelConfig`](crate::api::ModelConfig) to use, so the
//! orchestrator decides which model settings each role gets.
//!
//! | Agent | Function |
//! |-------|----------|
//! | Map-reduce condenser | [`condense::condense`] |
//! | Summary generator | [`generator::generate`] |
//! | Reflection verifier | [`verifier::verify_reflection`] |
//! | Readability verifier | [`verifier::verify_readability`] |
//! | Jargon definer | [`glossary::define_unclear_terms`] |

pub mod condense;
pub mod generator;
pub mod glossary;
pub mod prompt;
pub mod verifier;

pub use generator::Summary;
pub use verifier::Verdict;
