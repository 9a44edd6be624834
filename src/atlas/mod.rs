//! Atlas compositing and material rewriting.
//!
//! The compositor turns packed rectangles into one image per group; the
//! rewriter finds the image-texture nodes that must point at those images.

mod builder;
mod rewriter;

pub use builder::{atlas_size, pack_images, paste_position, scale_image, Atlas};
pub use rewriter::{replace_images, NodeSwap};
