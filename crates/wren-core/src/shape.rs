use std::fmt;

use crate::error::{Error, Result};

// Shape: ordered list of dimension sizes
//
// A Shape describes how a flat row-major buffer is laid out:
//   - Vector: Shape([5])            5 elements
//   - Matrix: Shape([3, 4])         12 elements
//   - Image batch: Shape([N,C,H,W]) element (n,c,h,w) at ((n*C+c)*H+h)*W+w
//
// An empty shape marks an uninitialized tensor. It is NOT a scalar: it
// cannot size a buffer, and neither can a shape containing a zero dimension.

/// Dimension sizes of a tensor, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Whether this shape is empty (the uninitialized state).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this shape can size a buffer: non-empty, no zero dimension.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|&d| d > 0)
    }

    /// Element count (product of all dimensions), or `InvalidShape`.
    pub fn elem_count(&self) -> Result<usize> {
        if !self.is_valid() {
            return Err(Error::InvalidShape {
                shape: self.clone(),
            });
        }
        Ok(self.0.iter().product())
    }

    /// Size of dimension `d`, if it exists.
    pub fn dim(&self, d: usize) -> Option<usize> {
        self.0.get(d).copied()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

// Shape::from((2, 3)) reads better than Shape::new(vec![2, 3]) at call sites.

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

macro_rules! shape_from_tuple {
    ($($d:ident),+) => {
        impl From<($(shape_from_tuple!(@usize $d),)+)> for Shape {
            fn from(($($d,)+): ($(shape_from_tuple!(@usize $d),)+)) -> Self {
                Shape(vec![$($d),+])
            }
        }
    };
    (@usize $d:ident) => {
        usize
    };
}

shape_from_tuple!(d0);
shape_from_tuple!(d0, d1);
shape_from_tuple!(d0, d1, d2);
shape_from_tuple!(d0, d1, d2, d3);
shape_from_tuple!(d0, d1, d2, d3, d4);

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}
