//! Fixed AVI header layout.
//!
//! The writer opens a file with a 224 byte prelude: the RIFF header, the
//! `hdrl` list holding the main and stream headers, and the opening of the
//! `movi` list. Fields whose values are only known at the end (sizes and
//! frame counts) are written as zero placeholders; their absolute offsets
//! are recorded by name in [`PlaceholderOffsets`] while the prelude is
//! built, and finalization patches through those recorded offsets.

use crate::chunks::chunk_ids;
use crate::error::{MjpegError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

/// hdrl list size: the main header chunk plus the whole stream list.
const HDRL_LIST_SIZE: u32 = 188;
/// strl list size: the strh and strf chunks.
const STRL_LIST_SIZE: u32 = 112;
const MAIN_HEADER_SIZE: u32 = 56;
const STREAM_HEADER_SIZE: u32 = 56;
const FORMAT_SIZE: u32 = 40;
/// avih/strh flag bit for a file carrying an idx1 chunk.
const HAS_INDEX: u32 = 0x10;

const STREAM_TYPE_VIDEO: [u8; 4] = *b"vids";

/// Codec fourccs written into the stream headers.
pub(crate) mod codec {
    /// Motion JPEG
    pub const MJPG: [u8; 4] = *b"MJPG";
}

/// Recording parameters, fixed for the lifetime of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

impl VideoParams {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        VideoParams { width, height, fps }
    }

    /// Expected length of one packed RGBA input frame in bytes.
    pub fn frame_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }

    /// Check that width, height and rate are all nonzero.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MjpegError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(MjpegError::InvalidFrameRate(self.fps));
        }
        Ok(())
    }

    pub(crate) fn microseconds_per_frame(&self) -> u32 {
        if self.fps > 0 {
            1_000_000 / self.fps
        } else {
            0
        }
    }

    /// Buffer size hint written into both headers, three bytes per pixel.
    pub(crate) fn suggested_buffer_size(&self) -> u32 {
        self.width.saturating_mul(self.height).saturating_mul(3)
    }
}

/// Absolute offsets of the placeholder fields patched at finalization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaceholderOffsets {
    /// RIFF size field.
    pub riff_size: u64,
    /// avih total frames field.
    pub total_frames: u64,
    /// strh length field.
    pub stream_length: u64,
    /// movi list size field.
    pub movi_size: u64,
    /// First byte of the movi list data; index offsets count from here.
    pub movi_data_start: u64,
}

/// Build the header prelude in memory, recording placeholder offsets.
pub(crate) fn build_prelude(params: &VideoParams) -> Result<(Vec<u8>, PlaceholderOffsets)> {
    let mut buf = Cursor::new(Vec::new());

    buf.write_all(chunk_ids::RIFF.as_bytes())?;
    let riff_size = buf.position();
    buf.write_u32::<LittleEndian>(0)?; // patched at finish
    buf.write_all(chunk_ids::AVI.as_bytes())?;

    buf.write_all(chunk_ids::LIST.as_bytes())?;
    buf.write_u32::<LittleEndian>(HDRL_LIST_SIZE)?;
    buf.write_all(chunk_ids::HDRL.as_bytes())?;

    let total_frames = write_main_header(&mut buf, params)?;

    buf.write_all(chunk_ids::LIST.as_bytes())?;
    buf.write_u32::<LittleEndian>(STRL_LIST_SIZE)?;
    buf.write_all(chunk_ids::STRL.as_bytes())?;

    let stream_length = write_stream_header(&mut buf, params)?;
    write_stream_format(&mut buf, params)?;

    buf.write_all(chunk_ids::LIST.as_bytes())?;
    let movi_size = buf.position();
    buf.write_u32::<LittleEndian>(0)?; // patched at finish
    let movi_data_start = buf.position();
    buf.write_all(chunk_ids::MOVI.as_bytes())?;

    let offsets = PlaceholderOffsets {
        riff_size,
        total_frames,
        stream_length,
        movi_size,
        movi_data_start,
    };

    Ok((buf.into_inner(), offsets))
}

/// Write the avih chunk, returning the total frames placeholder offset.
fn write_main_header(buf: &mut Cursor<Vec<u8>>, params: &VideoParams) -> Result<u64> {
    buf.write_all(chunk_ids::AVIH.as_bytes())?;
    buf.write_u32::<LittleEndian>(MAIN_HEADER_SIZE)?;
    buf.write_u32::<LittleEndian>(params.microseconds_per_frame())?;
    buf.write_u32::<LittleEndian>(0)?; // max bytes per sec
    buf.write_u32::<LittleEndian>(0)?; // padding granularity
    buf.write_u32::<LittleEndian>(HAS_INDEX)?;
    let total_frames = buf.position();
    buf.write_u32::<LittleEndian>(0)?; // total frames, patched at finish
    buf.write_u32::<LittleEndian>(0)?; // initial frames
    buf.write_u32::<LittleEndian>(1)?; // streams
    buf.write_u32::<LittleEndian>(params.suggested_buffer_size())?;
    buf.write_u32::<LittleEndian>(params.width)?;
    buf.write_u32::<LittleEndian>(params.height)?;
    buf.write_all(&[0u8; 16])?; // reserved
    Ok(total_frames)
}

/// Write the strh chunk, returning the stream length placeholder offset.
fn write_stream_header(buf: &mut Cursor<Vec<u8>>, params: &VideoParams) -> Result<u64> {
    buf.write_all(chunk_ids::STRH.as_bytes())?;
    buf.write_u32::<LittleEndian>(STREAM_HEADER_SIZE)?;
    buf.write_all(&STREAM_TYPE_VIDEO)?;
    buf.write_all(&codec::MJPG)?;
    buf.write_u32::<LittleEndian>(HAS_INDEX)?;
    buf.write_u16::<LittleEndian>(0)?; // priority
    buf.write_u16::<LittleEndian>(0)?; // language
    buf.write_u32::<LittleEndian>(0)?; // initial frames
    buf.write_u32::<LittleEndian>(1)?; // scale
    buf.write_u32::<LittleEndian>(params.fps)?; // rate
    buf.write_u32::<LittleEndian>(0)?; // start
    let stream_length = buf.position();
    buf.write_u32::<LittleEndian>(0)?; // length, patched at finish
    buf.write_u32::<LittleEndian>(params.suggested_buffer_size())?;
    buf.write_i32::<LittleEndian>(-1)?; // quality
    buf.write_u32::<LittleEndian>(0)?; // sample size
    buf.write_i16::<LittleEndian>(0)?; // frame rect
    buf.write_i16::<LittleEndian>(0)?;
    buf.write_i16::<LittleEndian>(params.width as i16)?;
    buf.write_i16::<LittleEndian>(params.height as i16)?;
    Ok(stream_length)
}

/// Write the strf chunk (BITMAPINFOHEADER).
fn write_stream_format(buf: &mut Cursor<Vec<u8>>, params: &VideoParams) -> Result<()> {
    buf.write_all(chunk_ids::STRF.as_bytes())?;
    buf.write_u32::<LittleEndian>(FORMAT_SIZE)?;
    buf.write_u32::<LittleEndian>(FORMAT_SIZE)?; // biSize
    buf.write_i32::<LittleEndian>(params.width as i32)?;
    buf.write_i32::<LittleEndian>(params.height as i32)?;
    buf.write_u16::<LittleEndian>(1)?; // planes
    buf.write_u16::<LittleEndian>(24)?; // bit count
    buf.write_all(&codec::MJPG)?; // compression
    buf.write_u32::<LittleEndian>(0)?; // image size
    buf.write_i32::<LittleEndian>(0)?; // x pels per meter
    buf.write_i32::<LittleEndian>(0)?; // y pels per meter
    buf.write_u32::<LittleEndian>(0)?; // colors used
    buf.write_u32::<LittleEndian>(0)?; // colors important
    Ok(())
}
