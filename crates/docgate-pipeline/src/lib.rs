//! Docgate Pipeline Library
//!
//! Stage gating for candidate pipelines: a candidate may enter a stage only
//! when it holds at least one attachment for every document category the
//! stage requires. Moves are validated in parallel, committed sequentially in
//! selection order, and reported per candidate.

pub mod attachments;
pub mod board;
pub mod categories;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod store;

// Re-export commonly used types
pub use attachments::AttachmentService;
pub use board::BoardSession;
pub use categories::DocumentCategoryModel;
pub use coordinator::{
    BlockReason, BlockedCandidate, MovePhase, MoveReport, MoveRequest, TransitionCoordinator,
};
pub use error::{PipelineError, PipelineResult};
pub use gate::{GateResult, StageGate};
pub use store::{
    AttachmentSource, BoardSnapshot, CandidateStore, HistoryLog, MemoryCandidateStore,
    StoreAttachmentSource,
};
