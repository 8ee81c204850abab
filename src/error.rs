//! Error types for the MJPEG/AVI writer.

use thiserror::Error;

/// Errors produced while writing an MJPEG/AVI file.
#[derive(Error, Debug)]
pub enum MjpegError {
    /// Frame dimensions a valid file cannot carry.
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested frame width.
        width: u32,
        /// Requested frame height.
        height: u32,
    },

    /// Frame rate a valid file cannot carry.
    #[error("invalid frame rate: {0} fps")]
    InvalidFrameRate(u32),

    /// The memory strategy could not satisfy an allocation request.
    #[error("allocation of {size} bytes failed")]
    AllocationFailed {
        /// Requested block size in bytes.
        size: usize,
    },

    /// The frame encoder reported a failure.
    #[error("frame encoding failed: {0}")]
    Encode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for writer operations.
pub type Result<T> = std::result::Result<T, MjpegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MjpegError::InvalidDimensions {
            width: 0,
            height: 480,
        };
        assert_eq!(err.to_string(), "invalid frame dimensions: 0x480");

        let err = MjpegError::AllocationFailed { size: 4096 };
        assert_eq!(err.to_string(), "allocation of 4096 bytes failed");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        let err: MjpegError = io.into();
        assert!(matches!(err, MjpegError::Io(_)));
    }
}
