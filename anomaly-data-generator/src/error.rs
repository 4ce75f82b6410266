/// Error taxonomy for the dataset synthesis pipeline.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operation invoked on a mesh with zero vertices. Fatal for that
    /// mesh variant; the batch orchestrator logs and skips.
    #[error("mesh `{0}` has no vertices")]
    EmptyMesh(String),

    /// Mesh has no triangles outside the anomaly region and no anomaly
    /// region either, so there is nothing to sample.
    #[error("mesh `{0}` has no triangles to sample from")]
    NoTriangles(String),

    /// Every triangle weight is zero (degenerate surface geometry).
    #[error("mesh `{0}` has no sampleable surface area")]
    DegenerateSurface(String),

    /// Scene lookup failed. Indicates a caller ordering bug (object not
    /// loaded before use), not a recoverable runtime condition.
    #[error("object `{0}` not found in scene")]
    ObjectNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed STL file `{}`: {reason}", path.display())]
    Stl { path: PathBuf, reason: String },

    #[error("point cloud error: {0}")]
    Las(#[from] las::Error),

    #[error("render output error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
