use thiserror::Error;

/// Errors surfaced by the core image-to-regions pipeline.
#[derive(Error, Debug)]
pub enum PbnError {
    /// Zero-sized image, `K < 1`, or a malformed palette/settings combination.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A logic failure such as averaging an empty set of weighted vectors.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// A post-reduction consistency check failed. Fatal to the run.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

pub type Result<T> = std::result::Result<T, PbnError>;
