//! Workflow states.

/// Where the controller is in the upload → generate cycle.
///
/// `Error` is transient: it is reported, then the controller settles on
/// `Idle` (failed ingest) or `Ready` (failed generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    /// Ingest request in flight.
    Processing,
    /// Chapters held; waiting for a generate request.
    Ready,
    /// Synthesize request in flight or progress animation running.
    GeneratingAudio,
    /// File list rendered.
    Done,
    Error,
}

impl WorkflowState {
    /// Whether a request is outstanding; controls stay disabled meanwhile.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Processing | Self::GeneratingAudio)
    }

    /// Whether an ingest may start from here.
    pub fn can_ingest(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Done | Self::Error)
    }

    /// Whether a generate request may start from here.
    pub fn can_generate(&self) -> bool {
        matches!(self, Self::Ready | Self::Done)
    }
}
