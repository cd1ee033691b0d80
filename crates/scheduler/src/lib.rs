//! Reelforge Scheduler
//!
//! Runs independent render jobs with bounded parallelism:
//! - **Runners:** How one job is executed (in-process engine or isolated worker process)
//! - **Batch:** Worker pool, per-job failure isolation, and result collection
//! - **Directory:** Job discovery from a directory of matching assets
//!
//! A batch always yields exactly one [`RenderOutcome`](reelforge_job_model::RenderOutcome)
//! per submitted job, in completion order.

pub mod batch;
pub mod directory;
pub mod runner;

pub use batch::*;
pub use directory::*;
pub use runner::*;
