//! Upload/generate workflow: state machine and controller.

mod controller;
mod state;

pub use controller::{GenerateOutcome, WorkflowController};
pub use state::WorkflowState;
