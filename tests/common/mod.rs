mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from nucleiband for tests
pub use nucleiband::{
    Channel, ChannelImage, ChannelSet, IndexSet, Pipeline, PipelineError, Region, RegionId,
    RunState, Segmenter, ThresholdConfig,
};
