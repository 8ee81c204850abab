//! Memory strategy and the encode scratch buffer.
//!
//! Every heap block the writer holds (the frame index and the encode
//! scratch buffer) is obtained through a [`MemStrategy`], so callers with
//! pooled or budgeted memory keep control of both allocations. The default
//! [`HeapStrategy`] uses the process allocator. A shared arena can back
//! several writers by keeping its state behind `Arc<Mutex<..>>` inside the
//! implementor and handing each writer a clone.

use crate::error::{MjpegError, Result};

/// Allocation source for the writer's internal buffers.
pub trait MemStrategy: Send {
    /// Allocate a zeroed block of `size` bytes.
    fn allocate(&mut self, size: usize) -> Result<Box<[u8]>>;

    /// Resize `block` to `new_size` bytes, preserving contents up to the
    /// smaller of the two sizes. On failure the block must be left usable
    /// at its old size.
    fn reallocate(&mut self, block: &mut Box<[u8]>, new_size: usize) -> Result<()>;

    /// Return a block to the strategy.
    fn release(&mut self, block: Box<[u8]>);
}

/// Default strategy backed by the process heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapStrategy;

impl MemStrategy for HeapStrategy {
    fn allocate(&mut self, size: usize) -> Result<Box<[u8]>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| MjpegError::AllocationFailed { size })?;
        buf.resize(size, 0);
        Ok(buf.into_boxed_slice())
    }

    fn reallocate(&mut self, block: &mut Box<[u8]>, new_size: usize) -> Result<()> {
        let mut grown = Vec::new();
        grown
            .try_reserve_exact(new_size)
            .map_err(|_| MjpegError::AllocationFailed { size: new_size })?;
        grown.resize(new_size, 0);

        let keep = block.len().min(new_size);
        grown[..keep].copy_from_slice(&block[..keep]);
        *block = grown.into_boxed_slice();
        Ok(())
    }

    fn release(&mut self, block: Box<[u8]>) {
        drop(block);
    }
}

/// Byte buffer for one frame's encoded output, backed by a strategy block.
///
/// The logical length resets between frames while the block is reused, so
/// a run of encodes settles on the largest frame seen. Growth is by exact
/// demand: the block is resized to precisely what the current frame needs.
pub(crate) struct ScratchBuf {
    block: Box<[u8]>,
    len: usize,
}

impl ScratchBuf {
    pub(crate) fn with_capacity(mem: &mut dyn MemStrategy, capacity: usize) -> Result<Self> {
        let block = mem.allocate(capacity)?;
        Ok(ScratchBuf { block, len: 0 })
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Bytes written since the last clear.
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.block[..self.len]
    }

    pub(crate) fn extend_from_slice(
        &mut self,
        mem: &mut dyn MemStrategy,
        data: &[u8],
    ) -> Result<()> {
        let needed = self.len + data.len();
        if needed > self.block.len() {
            mem.reallocate(&mut self.block, needed)?;
        }
        self.block[self.len..needed].copy_from_slice(data);
        self.len = needed;
        Ok(())
    }

    pub(crate) fn into_block(self) -> Box<[u8]> {
        self.block
    }
}
