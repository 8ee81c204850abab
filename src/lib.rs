//! Motion JPEG AVI Writer
//!
//! This crate writes AVI (Audio Video Interleave) files containing a single
//! Motion JPEG video stream. AVI is based on the RIFF (Resource Interchange
//! File Format) structure. Frames are compressed and appended incrementally,
//! so a recording can run for an unknown number of frames and still produce
//! a well-formed file once it is finished.
//!
//! # Features
//!
//! - Incremental muxing (open, add frames one at a time, finish)
//! - JPEG compression of raw RGBA frames
//! - idx1 index generation with keyframe flags
//! - Pluggable frame encoder and memory allocation strategy
//!
//! # Example
//!
//! ```no_run
//! use mjpeg_avi::{MjpegMuxer, VideoParams};
//!
//! fn main() -> mjpeg_avi::Result<()> {
//!     let params = VideoParams::new(640, 480, 30);
//!     let mut muxer = MjpegMuxer::create("out.avi", params)?;
//!
//!     let frame = vec![0u8; params.frame_len()];
//!     muxer.add_frame(&frame, 90)?;
//!
//!     muxer.finish()?;
//!     Ok(())
//! }
//! ```

mod chunks;
mod encoder;
mod error;
mod headers;
mod mem;
mod muxer;

pub use chunks::{FourCC, IndexEntry};
pub use encoder::{EncodeSink, FrameEncoder, JpegFrameEncoder};
pub use error::{MjpegError, Result};
pub use headers::VideoParams;
pub use mem::{HeapStrategy, MemStrategy};
pub use muxer::MjpegMuxer;
