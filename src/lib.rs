//! Innovation Intake: multi-step submission wizard core.

pub mod config;
pub mod error;
pub mod store;
pub mod submission;
