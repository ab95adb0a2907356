//! KeyCut video cutting library
//!
//! Keyframe-aware cut planning for lossless video editing. Selections are
//! turned into a plan of stream-copy and re-encode segments, the plan is
//! rendered into ffmpeg invocations, and the invocations run in parallel
//! with progress reporting and cancellation.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod selection;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{Micros, OutputFormat, SaveMode, SourceProfile, TimeSpan};
pub use engine::{CommandSynthesizer, Invocations, OutputTarget, TemplateRegistry};
pub use error::{CutError, CutResult};
pub use planner::{CutPlanner, KeyframeIndex, Plan};
pub use selection::SelectionSet;
