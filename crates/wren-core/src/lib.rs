//! # wren-core
//!
//! Core tensor primitives and errors for wren.
//!
//! This crate provides:
//! - [`Tensor`]: flat f32 buffer with a parallel gradient buffer
//! - [`Shape`]: dimension sizes and row-major element counts
//! - [`Error`] / [`ErrorKind`]: shape and state errors shared by every crate

pub mod error;
pub mod shape;
pub mod tensor;

pub use error::{Error, ErrorKind, Result};
pub use shape::Shape;
pub use tensor::Tensor;
