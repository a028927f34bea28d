//! Converts SMPL motion-capture parameters stored in a torch `.pt` container
//! into an AMASS-style `.npz` archive, re-expressing the motion in a Z-up
//! coordinate frame and pinning the first frame's root height.
//!
//! The interesting work lives in [`conversions::up_axis`]; [`codec`] holds the
//! readers/writers for the two container formats and [`convert`] wires the
//! whole pipeline together.
pub mod codec;
pub mod common;
pub mod conversions;
pub mod convert;
pub mod error;

pub use convert::{convert, ConvertSummary};
pub use error::ConvertError;
