//! Single-track download pipeline.
//!
//! Split into focused submodules:
//! - [`context`] - Shared collaborators and event emission
//! - [`orchestration`] - The per-track state machine, returns an [`Outcome`](crate::types::Outcome)
//! - [`streaming`] - Content stream transfer with optional real-time pacing
//! - [`post_process`] - Conversion, tags, cover art and lyrics
//! - [`finalization`] - Move into place, dedup records, outcome reporting

mod context;
mod finalization;
mod orchestration;
mod post_process;
mod streaming;


pub(crate) use context::PipelineContext;
pub(crate) use orchestration::run_track;
