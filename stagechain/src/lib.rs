//! # Stagechain
//!
//! A sequential stage-chain execution engine for photogrammetry processing runs.
//!
//! Stagechain links a fixed roster of processing stages into a single path
//! and runs them one after another against a shared context:
//!
//! - **Build-time fork**: `fast_orthophoto` decides whether dense
//!   reconstruction is part of the path
//! - **Key contracts**: every stage declares the context keys it reads and
//!   writes, checked before anything runs
//! - **Fail-fast execution**: the first stage failure stops the run and
//!   reaches the caller unchanged
//! - **Benchmarking**: an optional plain-text log of per-stage runtimes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagechain::prelude::*;
//!
//! let options = RunOptions::new("/data/project").with_fast_orthophoto(true);
//! let driver = PipelineDriver::new(options, &StageRegistry::dry_run())?;
//!
//! let ctx = driver.execute()?;
//! assert!(ctx.contains_key("orthophoto"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod benchmark;
pub mod chain;
pub mod context;
pub mod driver;
pub mod errors;
pub mod options;
pub mod progress;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::benchmark::BenchmarkLog;
    pub use crate::chain::{build_chain, Chain, ChainBuilder, ReconstructionPath, StageNode, StageRef};
    pub use crate::context::{keys, ExecutionContext, ProjectTree};
    pub use crate::driver::PipelineDriver;
    pub use crate::errors::{AlreadyConnectedError, ChainError, ChainValidationError, ContractErrorInfo};
    pub use crate::options::RunOptions;
    pub use crate::progress::{
        CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, StageProgress,
    };
    pub use crate::stages::{FnStage, NoOpStage, Stage, StageId, StageRegistry, StageRun};
    pub use crate::utils::{now_utc, Timestamp};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn library_compiles() {
        let chain = build_chain(RunOptions::new("/data/p"), &StageRegistry::dry_run()).unwrap();
        assert_eq!(chain.entry().name(), StageId::Multispectral.name());
    }
}
