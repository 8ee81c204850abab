//! Frame compression seam.
//!
//! The writer never compresses pixels itself. A [`FrameEncoder`] does,
//! pushing its output through an [`EncodeSink`]. The default
//! [`JpegFrameEncoder`] produces baseline JPEG through the `image` crate.

use crate::error::{MjpegError, Result};
use crate::mem::{MemStrategy, ScratchBuf};
use std::io::{self, Write};

/// Destination for one frame's encoded bytes.
///
/// Implements [`io::Write`]: whatever the encoder emits is appended to the
/// writer's scratch buffer, growing it through the memory strategy on
/// demand. A failed growth is remembered so the caller can report it as an
/// allocation failure rather than whatever error type the encoder wraps it
/// in.
pub struct EncodeSink<'a> {
    scratch: &'a mut ScratchBuf,
    mem: &'a mut dyn MemStrategy,
    failed: Option<MjpegError>,
}

impl<'a> EncodeSink<'a> {
    pub(crate) fn new(scratch: &'a mut ScratchBuf, mem: &'a mut dyn MemStrategy) -> Self {
        EncodeSink {
            scratch,
            mem,
            failed: None,
        }
    }

    /// Bytes accepted so far for the current frame.
    pub fn len(&self) -> usize {
        self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scratch.len() == 0
    }

    pub(crate) fn take_failure(&mut self) -> Option<MjpegError> {
        self.failed.take()
    }
}

impl Write for EncodeSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.scratch.extend_from_slice(self.mem, buf) {
            Ok(()) => Ok(buf.len()),
            Err(err) => {
                self.failed = Some(err);
                Err(io::Error::new(
                    io::ErrorKind::OutOfMemory,
                    "scratch buffer growth failed",
                ))
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Compresses one raw frame into the sink.
///
/// `pixels` is packed RGBA, four bytes per pixel, rows top to bottom. The
/// writer passes `quality` through untouched; what it means is up to the
/// implementation.
pub trait FrameEncoder: Send {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        quality: u8,
        sink: &mut EncodeSink<'_>,
    ) -> Result<()>;
}

/// Baseline JPEG encoder; `quality` is JPEG quality from 1 to 100.
pub struct JpegFrameEncoder {
    rgb: Vec<u8>,
}

impl JpegFrameEncoder {
    pub fn new() -> Self {
        JpegFrameEncoder { rgb: Vec::new() }
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        quality: u8,
        sink: &mut EncodeSink<'_>,
    ) -> Result<()> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if pixels.len() < expected {
            return Err(MjpegError::Encode(format!(
                "pixel buffer is {} bytes, {}x{} RGBA needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }

        // Strip the alpha channel; the conversion buffer is reused across frames.
        self.rgb.clear();
        self.rgb.reserve(expected / 4 * 3);
        for px in pixels[..expected].chunks_exact(4) {
            self.rgb.extend_from_slice(&px[..3]);
        }

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut *sink, quality);
        encoder
            .encode(&self.rgb, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| MjpegError::Encode(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::HeapStrategy;

    struct FailingRealloc;

    impl MemStrategy for FailingRealloc {
        fn allocate(&mut self, size: usize) -> Result<Box<[u8]>> {
            HeapStrategy.allocate(size)
        }

        fn reallocate(&mut self, _block: &mut Box<[u8]>, new_size: usize) -> Result<()> {
            Err(MjpegError::AllocationFailed { size: new_size })
        }

        fn release(&mut self, block: Box<[u8]>) {
            HeapStrategy.release(block);
        }
    }

    #[test]
    fn test_sink_accumulates() {
        let mut mem = HeapStrategy;
        let mut scratch = ScratchBuf::with_capacity(&mut mem, 4).unwrap();
        let mut sink = EncodeSink::new(&mut scratch, &mut mem);

        assert!(sink.is_empty());
        sink.write_all(&[1, 2, 3]).unwrap();
        sink.write_all(&[4, 5]).unwrap();
        assert_eq!(sink.len(), 5);
        assert!(sink.take_failure().is_none());

        assert_eq!(scratch.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sink_reports_failed_growth() {
        let mut mem = FailingRealloc;
        let mut scratch = ScratchBuf::with_capacity(&mut mem, 2).unwrap();
        let mut sink = EncodeSink::new(&mut scratch, &mut mem);

        let err = sink.write_all(&[0; 8]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::OutOfMemory);
        assert!(matches!(
            sink.take_failure(),
            Some(MjpegError::AllocationFailed { size: 8 })
        ));
    }

    #[test]
    fn test_jpeg_encoder_output_decodes() {
        let mut mem = HeapStrategy;
        let mut scratch = ScratchBuf::with_capacity(&mut mem, 64).unwrap();
        let mut sink = EncodeSink::new(&mut scratch, &mut mem);

        // Solid red 8x8 frame.
        let pixels: Vec<u8> = (0..8 * 8)
            .flat_map(|_| [255u8, 0, 0, 255])
            .collect();
        let mut encoder = JpegFrameEncoder::new();
        encoder.encode(&pixels, 8, 8, 90, &mut sink).unwrap();

        let jpeg = scratch.as_slice();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]); // SOI marker

        let decoded =
            image::load_from_memory_with_format(jpeg, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_jpeg_encoder_rejects_short_buffer() {
        let mut mem = HeapStrategy;
        let mut scratch = ScratchBuf::with_capacity(&mut mem, 64).unwrap();
        let mut sink = EncodeSink::new(&mut scratch, &mut mem);

        let mut encoder = JpegFrameEncoder::new();
        let err = encoder.encode(&[0u8; 16], 8, 8, 90, &mut sink).unwrap_err();
        assert!(matches!(err, MjpegError::Encode(_)));
    }
}
