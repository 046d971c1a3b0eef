//! CPU rendering module
//!
//! Strokes are rasterized with capsule SDFs. Two outputs:
//! - `artifact`: black-on-white PNG of the raw stroke, the judge's only input
//! - `preview`: themed RGBA view with the dashed target outline

pub mod artifact;
pub mod preview;
pub mod stroke;

pub use artifact::{ArtifactError, EncodedArtifact};
pub use preview::render_preview;
pub use stroke::{ink_pixel_count, rasterize_stroke};
