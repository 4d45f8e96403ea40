use thiserror::Error;

/// Error types for the registration pipeline.
#[derive(Debug, Error)]
pub enum IcpError {
    /// The spatial index was queried before being built, or built from no points.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Two point sets that must be paired row by row have different lengths.
    #[error("Mismatched point set lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    DimensionMismatch {
        /// Label for the left-hand point set
        left_name: &'static str,
        /// Length of the left-hand point set
        left_len: usize,
        /// Label for the right-hand point set
        right_name: &'static str,
        /// Length of the right-hand point set
        right_len: usize,
    },

    /// Not enough point pairs to estimate a rigid transform.
    #[error("Transform estimation requires at least {required} point pairs, got {actual}")]
    InsufficientPoints {
        /// Minimum number of point pairs required
        required: usize,
        /// Actual number of point pairs provided
        actual: usize,
    },

    /// A registration parameter is outside of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Returns a [`IcpError::DimensionMismatch`] unless both lengths agree.
pub(crate) fn ensure_same_len(
    left_name: &'static str,
    left_len: usize,
    right_name: &'static str,
    right_len: usize,
) -> Result<(), IcpError> {
    if left_len != right_len {
        return Err(IcpError::DimensionMismatch {
            left_name,
            left_len,
            right_name,
            right_len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_same_len() {
        assert!(ensure_same_len("source", 3, "target", 3).is_ok());

        let err = ensure_same_len("source", 3, "target", 4);
        assert!(matches!(
            err,
            Err(IcpError::DimensionMismatch {
                left_len: 3,
                right_len: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = IcpError::DimensionMismatch {
            left_name: "source",
            left_len: 3,
            right_name: "target",
            right_len: 4,
        };
        assert_eq!(
            err.to_string(),
            "Mismatched point set lengths: source (3) != target (4)"
        );
    }
}
