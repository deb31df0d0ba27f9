//! Upload pipeline: extract, summarize, render, publish.

mod display;
mod service;
pub mod types;

pub use display::{CollectingSurface, DisplaySurface, SurfaceState};
pub use service::{PipelineApi, UploadPipeline};
pub use types::{
    PipelineError, PipelineOutcome, PipelineStage, UploadedFile, sanitize_file_name,
};
