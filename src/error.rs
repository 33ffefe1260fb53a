//! Error handling for the lanescan library
//!
//! Scan kernels never fail: they report a position or a status. Errors come
//! from building descriptors (literals, class tables) and from configuration.

use crate::config::ValidationError;
use thiserror::Error;

/// Main error type for the lanescan library
#[derive(Error, Debug)]
pub enum ScanError {
    /// I/O related errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index out of bounds access
    #[error("Out of bounds: index {index}, size {size}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// Literal cannot be compiled into a scan descriptor
    #[error("Invalid literal: {message}")]
    InvalidLiteral {
        /// Error message describing the issue
        message: String,
    },

    /// Literal longer than the confirmation window
    #[error("Literal too long: {len} bytes, at most {max} supported")]
    LiteralTooLong {
        /// Length of the rejected literal
        len: usize,
        /// Largest supported length
        max: usize,
    },

    /// Character class needs more buckets than the tables provide
    #[error("Character class too complex: needs {required} buckets, {available} available")]
    ClassTooComplex {
        /// Buckets (or candidates) the class would need
        required: usize,
        /// Buckets (or candidates) the encoding offers
        available: usize,
    },

    /// Feature not supported on this CPU or build
    #[error("Not supported: {feature}")]
    NotSupported {
        /// Description of the unsupported feature
        feature: String,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// A configuration field failed validation
    #[error(transparent)]
    InvalidField(#[from] ValidationError),
}

impl ScanError {
    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::OutOfBounds { index, size }
    }

    /// Create an invalid literal error
    pub fn invalid_literal<S: Into<String>>(message: S) -> Self {
        Self::InvalidLiteral { message: message.into() }
    }

    /// Create a literal too long error
    pub fn literal_too_long(len: usize, max: usize) -> Self {
        Self::LiteralTooLong { len, max }
    }

    /// Create a class too complex error
    pub fn class_too_complex(required: usize, available: usize) -> Self {
        Self::ClassTooComplex { required, available }
    }

    /// Create a not supported error
    pub fn not_supported<S: Into<String>>(feature: S) -> Self {
        Self::NotSupported { feature: feature.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Check if this is a recoverable error
    ///
    /// A too-complex class is recoverable: the caller can switch to a
    /// strategy with a larger encoding (Truffle covers every class).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::ClassTooComplex { .. } => true,
            Self::NotSupported { .. } => true,
            Self::OutOfBounds { .. } => false,
            Self::InvalidLiteral { .. } => false,
            Self::LiteralTooLong { .. } => false,
            Self::Configuration { .. } => false,
            Self::InvalidField(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::OutOfBounds { .. } => "bounds",
            Self::InvalidLiteral { .. } => "literal",
            Self::LiteralTooLong { .. } => "literal",
            Self::ClassTooComplex { .. } => "class",
            Self::NotSupported { .. } => "unsupported",
            Self::Configuration { .. } => "config",
            Self::InvalidField(_) => "config",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

/// Assert that a scan range is within bounds
#[inline]
pub fn check_range(start: usize, end: usize, size: usize) -> Result<()> {
    if start > end {
        return Err(ScanError::configuration(format!(
            "Invalid range: start {} > end {}",
            start, end
        )));
    }
    if end > size {
        return Err(ScanError::out_of_bounds(end, size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ScanError::invalid_literal("empty");
        assert_eq!(err.category(), "literal");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_validation_error_keeps_field() {
        let err: ScanError =
            ValidationError::new("portable_width", "8", "not a register width").into();
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("portable_width"));
        match err {
            ScanError::InvalidField(e) => assert_eq!(e.value, "8"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_range_checking() {
        assert!(check_range(2, 8, 10).is_ok());
        assert!(check_range(8, 2, 10).is_err());
        assert!(check_range(2, 15, 10).is_err());
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(5, 5, 5).is_ok());
    }

    #[test]
    fn test_all_error_types() {
        let bounds_err = ScanError::out_of_bounds(5, 3);
        assert_eq!(bounds_err.category(), "bounds");
        assert!(!bounds_err.is_recoverable());

        let long_err = ScanError::literal_too_long(12, 8);
        assert_eq!(long_err.category(), "literal");
        assert!(!long_err.is_recoverable());

        let class_err = ScanError::class_too_complex(11, 8);
        assert_eq!(class_err.category(), "class");
        assert!(class_err.is_recoverable());

        let unsupported_err = ScanError::not_supported("avx512");
        assert_eq!(unsupported_err.category(), "unsupported");
        assert!(unsupported_err.is_recoverable());

        let config_err = ScanError::configuration("bad width");
        assert_eq!(config_err.category(), "config");
        assert!(!config_err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = ScanError::literal_too_long(12, 8);
        let display = format!("{}", err);
        assert!(display.contains("Literal too long"));
        assert!(display.contains("12"));
        assert!(display.contains("8"));

        let class_err = ScanError::class_too_complex(9, 8);
        let class_display = format!("{}", class_err);
        assert!(class_display.contains("needs 9 buckets"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let scan_error: ScanError = io_error.into();
        assert_eq!(scan_error.category(), "io");
        assert!(scan_error.is_recoverable());
        assert!(format!("{}", scan_error).contains("I/O error"));
    }
}
