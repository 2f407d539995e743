//! Frame Processing Scheduler
//!
//! Takes the latest frame from the mailbox at a fixed cadence, fans it out
//! to the detector pipeline and writes the results into the aggregation
//! store. Runs on its own OS thread, independent of frame arrival rate.

mod pipeline;
mod scheduler;

pub use pipeline::{DetectorPipeline, TickReport};
pub use scheduler::{ProcessingScheduler, SchedulerConfig, SchedulerError, WorkerState};
