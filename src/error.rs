use crate::models::RegionId;

/// Result type for classification operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while classifying regions
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration rejected before any segmentation call. Not retryable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The segmentation collaborator failed or timed out. The caller may retry.
    #[error("Segmentation unavailable: {0}")]
    SegmentationUnavailable(String),

    /// A region with an empty boundary reached a geometric operation.
    #[error("Degenerate region: {0}")]
    DegenerateRegion(RegionId),

    #[error("Out of bounds: pixel ({x}, {y}) not in channel of size {width}x{height}")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// A channel does not share the nucleus channel's coordinate frame.
    /// Fatal like `OutOfBounds`.
    #[error("Out of bounds: channel {channel} is {actual:?}, nucleus frame is {expected:?}")]
    FrameMismatch {
        channel: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Region not found: {0}")]
    NotFound(RegionId),
}
