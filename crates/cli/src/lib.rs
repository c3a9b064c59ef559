//! Image adapters for the `hornschunck` command-line driver
//!
//! - [`input`] decodes frames into bordered luminance buffers
//! - [`render`] encodes solver fields as 8-bit images

pub mod input;
pub mod render;
