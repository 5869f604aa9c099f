//! Procedural batch image generation.
//!
//! A seeded [`rand::Rng`] drives an [`art::Scene`] (a bright background plus a pile of random
//! rectangles), which is rasterized, encoded through an [`encode::Encoder`], and handed to a
//! [`sink::Sink`]. [`batch::BatchScheduler`] fans that work out over a worker pool and reports
//! through a shared [`progress::BatchProgress`].

pub mod art;
pub mod batch;
pub mod color;
pub mod config;
pub mod encode;
pub mod error;
pub mod estimate;
pub mod format;
pub mod geometry;
pub mod progress;
pub mod rand;
pub mod sink;
