use std::fmt;

use crate::error::{Error, Result};
use crate::shape::Shape;

// Tensor: a flat f32 buffer plus an equally-sized gradient buffer
//
// Unlike a graph-tracking tensor, this one is a plain value: it records no
// history and holds no references to other tensors. Layers read `data`,
// write `data` of their outputs, and exchange gradients through `grad`.
//
// LIFECYCLE:
//
//   Tensor::default()        uninitialized (empty shape, no buffers)
//   t.shape = (2, 3).into()  declares the layout
//   t.resize()               data becomes 6 zeros
//   t.resize_grad()          grad becomes 6 zeros
//
// The `grad` buffer stays empty until someone asks for gradients, which is
// how layers tell "no upstream gradient supplied" apart from "zero gradient".

/// Maximum number of elements shown per buffer by the `Display` impl.
pub const PREVIEW_LIMIT: usize = 5;

/// An n-dimensional f32 buffer with a parallel gradient buffer.
///
/// # Example
/// ```
/// use wren_core::Tensor;
///
/// let mut t = Tensor::default();
/// t.shape = (2, 3).into();
/// t.resize().unwrap();
/// t.resize_grad().unwrap();
/// assert_eq!(t.data.len(), 6);
/// assert_eq!(t.grad.len(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tensor {
    /// Dimension sizes, row-major.
    pub shape: Shape,
    /// Element values, `size()` long once resized.
    pub data: Vec<f32>,
    /// Gradient values, same length as `data` once resized for gradients.
    pub grad: Vec<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor of the given shape (no gradient buffer).
    pub fn new(shape: impl Into<Shape>) -> Result<Self> {
        let mut t = Tensor {
            shape: shape.into(),
            ..Default::default()
        };
        t.resize()?;
        Ok(t)
    }

    /// Create a tensor filled with `value`.
    pub fn full(shape: impl Into<Shape>, value: f32) -> Result<Self> {
        let shape = shape.into();
        let n = shape.elem_count()?;
        Ok(Tensor {
            shape,
            data: vec![value; n],
            grad: Vec::new(),
        })
    }

    /// Create a tensor from existing data; the length must match the shape.
    pub fn from_vec(data: Vec<f32>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count()?;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                op: "Tensor::from_vec",
                expected,
                got: data.len(),
            });
        }
        Ok(Tensor {
            shape,
            data,
            grad: Vec::new(),
        })
    }

    /// Whether the shape can size a buffer (non-empty, no zero dimension).
    pub fn validate_shape(&self) -> bool {
        self.shape.is_valid()
    }

    /// Number of elements implied by the shape.
    pub fn size(&self) -> Result<usize> {
        self.shape.elem_count()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Size `data` to `size()`, zero-filling new elements.
    pub fn resize(&mut self) -> Result<()> {
        let n = self.size()?;
        self.data.resize(n, 0.0);
        Ok(())
    }

    /// Size `grad` to `size()`, zero-filling new elements.
    ///
    /// Existing gradient values are kept, so parameter gradients keep
    /// accumulating across backward calls.
    pub fn resize_grad(&mut self) -> Result<()> {
        let n = self.size()?;
        self.grad.resize(n, 0.0);
        Ok(())
    }

    /// Fill `grad` with zeros.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Whether a gradient buffer matching `data` is present.
    pub fn has_grad(&self) -> bool {
        !self.grad.is_empty() && self.grad.len() == self.data.len()
    }
}

/// Render at most `limit` elements, then `, ...` if anything was cut.
fn preview<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T], limit: usize) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().take(limit).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    if values.len() > limit {
        write!(f, ", ...")?;
    }
    write!(f, "]")
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor@{:p}", self)?;
        if self.shape.is_empty() {
            return write!(f, "(not initialized)");
        }

        write!(f, "(shape={}", self.shape)?;

        if self.data.is_empty() {
            write!(f, ", data=[no data]")?;
        } else {
            write!(f, ", data=")?;
            preview(f, &self.data, PREVIEW_LIMIT)?;
        }

        if !self.grad.is_empty() {
            write!(f, ", grad=")?;
            preview(f, &self.grad, PREVIEW_LIMIT)?;
        }
        write!(f, ")")
    }
}
