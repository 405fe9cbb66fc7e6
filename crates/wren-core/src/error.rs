use crate::shape::Shape;

/// Broad classification of an [`Error`].
///
/// Callers that only care whether they passed malformed tensors or called
/// things in the wrong order can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or mismatched shape, rank, feature count or buffer size.
    Shape,
    /// An operation was invoked out of its required order.
    State,
}

/// All errors that can occur within wren.
///
/// Shape errors come from malformed or mismatched tensors; state errors come
/// from calling backward without the forward pass that populates its caches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape is empty or contains a zero dimension, so it cannot size a buffer.
    #[error("invalid tensor shape {shape}: dimensions must be non-empty and non-zero")]
    InvalidShape { shape: Shape },

    /// Operation requires a specific rank (number of dimensions).
    #[error("{op}: rank mismatch, expected rank {expected}, got {got}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// Feature / channel dimension does not match the layer's configuration.
    #[error("{op}: expected {expected} features, got {got}")]
    FeatureMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// A buffer holds a different number of elements than required.
    #[error("{op}: element count mismatch, expected {expected}, got {got}")]
    ElementCountMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// The upstream gradient buffer is absent.
    #[error("{op}: output gradient buffer is empty")]
    MissingGrad { op: &'static str },

    /// Backward was called before any forward populated the layer's cache.
    #[error("{op}: backward called before forward")]
    BackwardBeforeForward { op: &'static str },

    /// Cached forward state does not line up with the backward call.
    #[error("{op}: stale forward cache, expected {expected} entries, got {got}")]
    StaleCache {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// The model holds no layers to run.
    #[error("model has no layers")]
    EmptyModel,
}

impl Error {
    /// Which broad category this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidShape { .. }
            | Error::RankMismatch { .. }
            | Error::FeatureMismatch { .. }
            | Error::ElementCountMismatch { .. }
            | Error::MissingGrad { .. } => ErrorKind::Shape,
            Error::BackwardBeforeForward { .. } | Error::StaleCache { .. } | Error::EmptyModel => {
                ErrorKind::State
            }
        }
    }

    pub fn is_shape_error(&self) -> bool {
        self.kind() == ErrorKind::Shape
    }

    pub fn is_state_error(&self) -> bool {
        self.kind() == ErrorKind::State
    }
}

/// Convenience Result type used throughout wren.
pub type Result<T> = std::result::Result<T, Error>;
