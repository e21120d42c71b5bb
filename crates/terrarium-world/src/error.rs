//! Error types for the `terrarium-world` crate.
//!
//! World components only fail at construction time. Once built, every
//! update clamps out-of-range values instead of reporting them.

/// Errors that can occur while constructing world components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// The torus or grid dimensions are unusable.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// Explanation of what is wrong with the dimensions.
        reason: String,
    },
}
