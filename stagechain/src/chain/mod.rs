//! Chain building and execution.
//!
//! This module provides:
//! - Stage nodes and handles
//! - A builder that links stages into a single validated path
//! - The built chain and its sequential run
//! - The standard processing chain with its reconstruction fork

mod builder;
mod graph;
mod integration_tests;
mod node;
mod standard;

pub use builder::{ChainBuilder, Link};
pub use graph::Chain;
pub use node::{StageNode, StageRef};
pub use standard::{build_chain, standard_sequence, ReconstructionPath, STANDARD_CHAIN};
