// Declare submodules
mod common;
mod relevance;
mod scoring;

pub use common::*;
pub use relevance::relevance_prompt;
pub use scoring::impact_score_prompt;
