//! MJPEG/AVI muxer.

use crate::chunks::{chunk_ids, IndexEntry, IndexTable};
use crate::encoder::{EncodeSink, FrameEncoder, JpegFrameEncoder};
use crate::error::Result;
use crate::headers::{build_prelude, PlaceholderOffsets, VideoParams};
use crate::mem::{HeapStrategy, MemStrategy, ScratchBuf};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Incremental single-stream MJPEG/AVI writer.
///
/// A muxer is created against a seekable byte sink and writes the header
/// prelude immediately. Raw RGBA frames are appended one at a time with
/// [`add_frame`](Self::add_frame); [`finish`](Self::finish) consumes the
/// muxer, writes the index and patches the size and count fields that were
/// placeholders until then. Dropping a muxer without finishing leaves the
/// output without an index and with zeroed size fields.
pub struct MjpegMuxer<W: Write + Seek> {
    writer: W,
    params: VideoParams,
    mem: Box<dyn MemStrategy>,
    encoder: Box<dyn FrameEncoder>,
    offsets: PlaceholderOffsets,
    scratch: ScratchBuf,
    index: IndexTable,
    frame_count: u32,
}

impl MjpegMuxer<BufWriter<File>> {
    /// Create `path` and write the file prelude.
    pub fn create<P: AsRef<Path>>(path: P, params: VideoParams) -> Result<Self> {
        let file = File::create(path)?;
        MjpegMuxer::new(BufWriter::new(file), params)
    }
}

impl<W: Write + Seek> MjpegMuxer<W> {
    /// Create a muxer with the default JPEG encoder and heap allocation.
    pub fn new(writer: W, params: VideoParams) -> Result<Self> {
        Self::with_parts(
            writer,
            params,
            Box::new(JpegFrameEncoder::new()),
            Box::new(HeapStrategy),
        )
    }

    /// Create a muxer with a caller-supplied encoder and memory strategy.
    pub fn with_parts(
        mut writer: W,
        params: VideoParams,
        encoder: Box<dyn FrameEncoder>,
        mut mem: Box<dyn MemStrategy>,
    ) -> Result<Self> {
        params.validate()?;

        let (prelude, offsets) = build_prelude(&params)?;
        writer.write_all(&prelude)?;

        let index = IndexTable::new(mem.as_mut())?;
        let scratch_size = (params.width as usize).saturating_mul(params.height as usize);
        let scratch = match ScratchBuf::with_capacity(mem.as_mut(), scratch_size) {
            Ok(scratch) => scratch,
            Err(err) => {
                mem.release(index.into_block());
                return Err(err);
            }
        };

        log::debug!(
            "header written: {}x{} at {} fps, movi data at {}",
            params.width,
            params.height,
            params.fps,
            offsets.movi_data_start
        );

        Ok(MjpegMuxer {
            writer,
            params,
            mem,
            encoder,
            offsets,
            scratch,
            index,
            frame_count: 0,
        })
    }

    /// Compress `pixels` and append it as the next frame chunk.
    ///
    /// `pixels` is one full frame of packed RGBA. `quality` goes to the
    /// encoder untouched; for the default encoder it is JPEG quality from
    /// 1 to 100. On an allocation failure the output stream has not been
    /// touched, the frame is not counted and the call may be retried.
    pub fn add_frame(&mut self, pixels: &[u8], quality: u8) -> Result<()> {
        self.scratch.clear();

        let mut sink = EncodeSink::new(&mut self.scratch, self.mem.as_mut());
        let encoded = self.encoder.encode(
            pixels,
            self.params.width,
            self.params.height,
            quality,
            &mut sink,
        );
        if let Some(err) = sink.take_failure() {
            return Err(err);
        }
        encoded?;

        // Grow the index before the chunk reaches the stream, so an
        // allocation failure leaves the file as it was.
        self.index.reserve_one(self.mem.as_mut())?;

        let encoded_len = self.scratch.len();
        let padded = (encoded_len + 1) & !1;

        let chunk_pos = self.writer.stream_position()?;
        self.writer.write_all(chunk_ids::VIDEO_FRAME.as_bytes())?;
        self.writer.write_u32::<LittleEndian>(padded as u32)?;
        self.writer.write_all(self.scratch.as_slice())?;
        if encoded_len % 2 != 0 {
            self.writer.write_all(&[0])?;
        }

        self.index.push(
            self.mem.as_mut(),
            IndexEntry {
                chunk_id: chunk_ids::VIDEO_FRAME,
                flags: IndexEntry::KEYFRAME,
                offset: (chunk_pos - self.offsets.movi_data_start) as u32,
                size: padded as u32,
            },
        )?;

        self.frame_count += 1;
        Ok(())
    }

    /// Finish the file and hand the writer back.
    ///
    /// Patches the frame counts, appends the idx1 chunk, patches the movi
    /// and RIFF sizes, then releases the internal buffers to the memory
    /// strategy and flushes. Buffers are released even when finalization
    /// fails.
    pub fn finish(mut self) -> Result<W> {
        let finalized = self.finalize();

        let MjpegMuxer {
            mut writer,
            mut mem,
            scratch,
            index,
            ..
        } = self;
        mem.release(scratch.into_block());
        mem.release(index.into_block());

        finalized?;
        writer.flush()?;
        Ok(writer)
    }

    fn finalize(&mut self) -> Result<()> {
        self.patch_u32(self.offsets.total_frames, self.frame_count)?;
        self.patch_u32(self.offsets.stream_length, self.frame_count)?;

        self.writer.seek(SeekFrom::End(0))?;
        self.writer.write_all(chunk_ids::IDX1.as_bytes())?;
        self.writer
            .write_u32::<LittleEndian>((self.index.len() * IndexTable::ENTRY_SIZE) as u32)?;
        self.writer.write_all(self.index.as_bytes())?;

        // The movi size spans its list data and the trailing index.
        let end = self.writer.stream_position()?;
        self.patch_u32(
            self.offsets.movi_size,
            (end - self.offsets.movi_data_start) as u32,
        )?;
        self.patch_u32(self.offsets.riff_size, (end - 8) as u32)?;

        log::debug!("finalized: {} frames, {} bytes", self.frame_count, end);
        Ok(())
    }

    fn patch_u32(&mut self, offset: u64, value: u32) -> Result<()> {
        self.writer.seek(SeekFrom::Start(offset))?;
        self.writer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Number of frames appended so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Recording parameters this file was opened with.
    pub fn params(&self) -> VideoParams {
        self.params
    }
}
