mod error;
mod outcome;
mod runner;

pub use error::BatchError;
pub use outcome::{BatchSummary, ModelScore, TaleResult};
pub use runner::{BatchRunner, BatchSettings};
