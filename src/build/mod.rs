mod core;
mod feedback;
mod pipeline;
mod toolchain;

pub use core::{CompileOutcome, compile_package};
pub use feedback::FeedbackAnalyzer;
pub use pipeline::{BuildPipeline, configure_options};
pub use toolchain::Toolchain;
