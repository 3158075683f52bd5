//! Core image-to-regions pipeline for paint-by-numbers vector artwork:
//! color quantization, narrow-strip cleanup, facet construction and
//! reduction, border tracing/smoothing, and label-point placement.
//!
//! File decoding/encoding, SVG/PNG/JPG serialization, the CLI surface, and
//! progress display are collaborators' concerns, not this crate's.

pub mod border;
pub mod error;
pub mod facet;
pub mod facet_builder;
pub mod facet_reducer;
pub mod flood_fill;
pub mod grid;
pub mod kmeans;
pub mod narrow_strip;
pub mod pipeline;
pub mod polylabel;
pub mod quantizer;
pub mod random;
pub mod settings;
pub mod vector;

pub use error::{PbnError, Result};
pub use pipeline::{run, PipelineResult, ProgressCallback};
pub use settings::Settings;
