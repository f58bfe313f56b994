pub mod config;
pub mod error;
pub mod index_set;
pub mod measurement;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod segmentation;
pub mod store;

pub use config::ThresholdConfig;
pub use error::{PipelineError, PipelineResult};
pub use index_set::IndexSet;
pub use models::{Band, Channel, ChannelImage, ChannelSet, PixelMask, Region, RegionId};
pub use pipeline::{Pipeline, RegionMeasurement, RunReport, RunState, StageCounts};
pub use report::{AnnotationClass, AnnotationRequest, AnnotationStyle};
pub use segmentation::{LabelImageSegmenter, Segmenter, ThresholdSegmenter};
pub use store::RegionStore;
