//! CNER Annotation Pipeline
//!
//! Turns a file of raw Burmese sentences into a JSON Lines file of
//! entity-annotated records, using an LLM oracle for both extraction and
//! label repair.
//!
//! ## Architecture
//!
//! ```text
//! ResumeSet → BatchOrchestrator → ExtractionStage → CorrectionStage → JsonlSink
//! ```
//!
//! - One extraction call per batch, with a random pair of few-shot examples.
//! - Labels outside the 18-label taxonomy are sent back for repair, one call
//!   per offending record, for a bounded number of loops.
//! - Records without entities are dropped. Kept records are appended and
//!   synced after every batch, so an interrupted run resumes where it stopped.

pub mod error;
pub mod types;
pub mod taxonomy;
pub mod prompt;
pub mod sampler;
pub mod parser;
pub mod extractor;
pub mod corrector;
pub mod resume;
pub mod output;
pub mod runner;

pub use corrector::CorrectionStage;
pub use error::AnnotationError;
pub use extractor::ExtractionStage;
pub use output::JsonlSink;
pub use resume::{load_resume_set, ResumeSet};
pub use runner::BatchOrchestrator;
pub use taxonomy::Taxonomy;
pub use types::*;
