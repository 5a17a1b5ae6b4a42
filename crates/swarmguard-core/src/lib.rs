//! # swarmguard-core
//!
//! Core types for the swarmguard agent harness.
//!
//! An agent is nothing more than a named role with a prompt. A plan is an
//! ordered list of tasks, each handed to one agent along with the files it
//! is expected to produce. Agents answer with tool calls; the orchestrator
//! patches, executes and validates them, and steps in when an agent keeps
//! failing the same way.

pub mod config;
mod error;
pub mod fail_open;
mod plan;
mod types;

pub use config::SwarmConfig;
pub use error::{Result, SwarmError};
pub use plan::{builtin_roster, default_plan, Plan};
pub use types::*;
