//! Error types for nusense

use thiserror::Error;

/// Result type alias using nusense's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building operators or setting up a reconstruction
///
/// All of these are precondition violations: they are reported once, at
/// construction time, and nothing in the crate retries after one.
#[derive(Error, Debug)]
pub enum Error {
    /// Shapes of two chained operators (or an operator and a buffer) disagree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected extents
        expected: Vec<usize>,
        /// Actual extents
        got: Vec<usize>,
    },

    /// A flat buffer does not hold the number of elements its shape requires
    #[error("Buffer '{what}' has {got} elements, expected {expected}")]
    BufferSize {
        /// Which buffer
        what: &'static str,
        /// Required element count
        expected: usize,
        /// Provided element count
        got: usize,
    },

    /// K-space with more than one map is not a valid measurement
    #[error("Unsupported maps configuration: k-space has {maps} maps, expected 1")]
    UnsupportedMaps {
        /// Extent of the maps dimension in k-space
        maps: usize,
    },

    /// The requested execution target is not available in this build
    #[error("Device '{0}' is not available in this build")]
    UnsupportedDevice(&'static str),

    /// Invalid argument provided to a constructor
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Reconstruction options could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Build a `BufferSize` error unless `got == expected`
    pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
        if expected == got {
            Ok(())
        } else {
            Err(Error::BufferSize { what, expected, got })
        }
    }
}
