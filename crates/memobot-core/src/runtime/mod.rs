//! Turn orchestration

mod turn;

pub use turn::{TurnError, TurnOutcome, TurnPipeline, TurnPipelineConfig};
