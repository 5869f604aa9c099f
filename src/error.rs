use std::path::PathBuf;

use crate::format::ImageFormat;

/// Settings that can never start a batch. Reported synchronously by
/// [`BatchScheduler::start`](crate::batch::BatchScheduler::start).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least one output format must be enabled")]
    NoFormats,

    #[error("unknown image format {0:?} (expected \"png\" or \"jpeg\")")]
    UnknownFormat(String),

    #[error("invalid {axis} range: min {min} is greater than max {max}")]
    InvertedRange {
        axis: &'static str,
        min: u32,
        max: u32,
    },

    #[error("invalid {axis} range: minimum {min} is below 2 pixels")]
    DimensionTooSmall { axis: &'static str, min: u32 },

    #[error("cannot parse dimension range {0:?} (expected MIN..MAX or N)")]
    MalformedRange(String),

    #[error("cannot parse seed {0:?} (expected decimal or 0x-prefixed hex, at most 64 bits)")]
    MalformedSeed(String),

    #[error("minimum aspect ratio {0} is outside [0, 1]")]
    RatioOutOfRange(f64),

    #[error("JPEG quality {0} is outside [0, 1]")]
    QualityOutOfRange(f64),

    #[error(
        "minimum aspect ratio {ratio} cannot be met: raising {axis} to {needed} exceeds its max {max}"
    )]
    AspectUnsatisfiable {
        ratio: f64,
        axis: &'static str,
        needed: u32,
        max: u32,
    },
}

/// Why [`BatchScheduler::start`](crate::batch::BatchScheduler::start) refused to begin a batch.
#[derive(thiserror::Error, Debug)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a batch is already running")]
    AlreadyRunning,
}

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("worker thread count must be >= 1 when set")]
    ZeroThreads,

    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    #[error("cannot allocate a {width}x{height} drawing surface")]
    Allocation { width: u32, height: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum EncodingError {
    #[error("{format} encoding failed: {source}")]
    Codec {
        format: ImageFormat,
        #[source]
        source: image::ImageError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sink rejected image: {0}")]
    Rejected(String),
}

/// A single unit that could not produce an image. Recovered locally: the unit still counts as
/// completed and the batch carries on.
#[derive(thiserror::Error, Debug)]
pub enum UnitFailure {
    #[error("compose: {0}")]
    Compose(#[from] ComposeError),

    #[error("encode: {0}")]
    Encode(#[from] EncodingError),

    #[error("write: {0}")]
    Write(#[from] WriteError),

    #[error("panicked: {0}")]
    Panicked(String),
}
