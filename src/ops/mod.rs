//! Orchestration: per-file state machine, directory runs and dispatch.

mod engine;
mod types;

pub use engine::Engine;
pub use types::{
    BatchReport, FileFailure, FileOp, FileState, FileTask, KeySource, Operation, Outcome, Target,
};
