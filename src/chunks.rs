//! RIFF chunk identifiers and the frame index.

use crate::error::Result;
use crate::mem::MemStrategy;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// FourCC (Four Character Code) identifier
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create from bytes
    pub fn new(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }

    /// Get as string
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.0).to_string()
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCC(\"{}\")", self.as_str())
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }
}

/// Chunk IDs the writer emits
pub mod chunk_ids {
    use super::FourCC;

    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const AVI: FourCC = FourCC(*b"AVI ");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const HDRL: FourCC = FourCC(*b"hdrl");
    pub const AVIH: FourCC = FourCC(*b"avih");
    pub const STRL: FourCC = FourCC(*b"strl");
    pub const STRH: FourCC = FourCC(*b"strh");
    pub const STRF: FourCC = FourCC(*b"strf");
    pub const MOVI: FourCC = FourCC(*b"movi");
    pub const IDX1: FourCC = FourCC(*b"idx1");
    /// Compressed video frame chunk for stream zero.
    pub const VIDEO_FRAME: FourCC = FourCC(*b"00dc");
}

/// AVI index entry (idx1 format)
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    /// Chunk ID
    pub chunk_id: FourCC,
    /// Flags
    pub flags: u32,
    /// Offset from the start of the movi list data
    pub offset: u32,
    /// Size of chunk data, after padding
    pub size: u32,
}

impl IndexEntry {
    /// Index flags
    pub const KEYFRAME: u32 = 0x10;

    /// Read from data
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let mut id_bytes = [0u8; 4];
        cursor.read_exact(&mut id_bytes)?;

        Ok(IndexEntry {
            chunk_id: FourCC(id_bytes),
            flags: cursor.read_u32::<LittleEndian>()?,
            offset: cursor.read_u32::<LittleEndian>()?,
            size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Write to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.chunk_id.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    /// Check if this is a keyframe
    pub fn is_keyframe(&self) -> bool {
        (self.flags & Self::KEYFRAME) != 0
    }
}

/// Growable table of index entries kept in wire format.
///
/// Entries are serialized into a strategy-owned block as they arrive, so
/// finalization writes the whole idx1 body with a single call. The block
/// doubles when full, starting at sixteen entries.
pub(crate) struct IndexTable {
    block: Box<[u8]>,
    count: usize,
}

impl IndexTable {
    /// Serialized entry size in bytes.
    pub(crate) const ENTRY_SIZE: usize = 16;

    const INITIAL_ENTRIES: usize = 16;

    pub(crate) fn new(mem: &mut dyn MemStrategy) -> Result<Self> {
        let block = mem.allocate(Self::INITIAL_ENTRIES * Self::ENTRY_SIZE)?;
        Ok(IndexTable { block, count: 0 })
    }

    /// Grow through the strategy if one more entry would not fit.
    pub(crate) fn reserve_one(&mut self, mem: &mut dyn MemStrategy) -> Result<()> {
        if (self.count + 1) * Self::ENTRY_SIZE > self.block.len() {
            let new_size = if self.block.is_empty() {
                Self::INITIAL_ENTRIES * Self::ENTRY_SIZE
            } else {
                self.block.len() * 2
            };
            mem.reallocate(&mut self.block, new_size)?;
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, mem: &mut dyn MemStrategy, entry: IndexEntry) -> Result<()> {
        self.reserve_one(mem)?;
        let at = self.count * Self::ENTRY_SIZE;
        let mut slot = &mut self.block[at..at + Self::ENTRY_SIZE];
        entry.write(&mut slot)?;
        self.count += 1;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Entries as they appear on the wire.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.block[..self.count * Self::ENTRY_SIZE]
    }

    pub(crate) fn into_block(self) -> Box<[u8]> {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::HeapStrategy;

    #[test]
    fn test_fourcc() {
        let fourcc = FourCC::new(*b"RIFF");
        assert_eq!(fourcc.as_str(), "RIFF");
        assert_eq!(fourcc.as_bytes(), b"RIFF");
        assert_eq!(format!("{fourcc}"), "RIFF");
    }

    #[test]
    fn test_chunk_ids() {
        assert_eq!(chunk_ids::RIFF.as_str(), "RIFF");
        assert_eq!(chunk_ids::AVI.as_str(), "AVI ");
        assert_eq!(chunk_ids::VIDEO_FRAME.as_str(), "00dc");
    }

    #[test]
    fn test_index_entry_roundtrip() {
        let entry = IndexEntry {
            chunk_id: chunk_ids::VIDEO_FRAME,
            flags: IndexEntry::KEYFRAME,
            offset: 1000,
            size: 5000,
        };

        assert!(entry.is_keyframe());

        let mut buffer = Vec::new();
        entry.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 16);

        let parsed = IndexEntry::read(&buffer).unwrap();
        assert_eq!(parsed.chunk_id, entry.chunk_id);
        assert_eq!(parsed.flags, entry.flags);
        assert_eq!(parsed.offset, entry.offset);
        assert_eq!(parsed.size, entry.size);
    }

    #[test]
    fn test_index_entry_read_short_data() {
        assert!(IndexEntry::read(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_index_table_push() {
        let mut mem = HeapStrategy;
        let mut table = IndexTable::new(&mut mem).unwrap();
        assert_eq!(table.len(), 0);
        assert!(table.as_bytes().is_empty());

        table
            .push(
                &mut mem,
                IndexEntry {
                    chunk_id: chunk_ids::VIDEO_FRAME,
                    flags: IndexEntry::KEYFRAME,
                    offset: 4,
                    size: 100,
                },
            )
            .unwrap();

        assert_eq!(table.len(), 1);
        let parsed = IndexEntry::read(table.as_bytes()).unwrap();
        assert_eq!(parsed.offset, 4);
        assert_eq!(parsed.size, 100);
    }

    #[test]
    fn test_index_table_growth_keeps_entries() {
        let mut mem = HeapStrategy;
        let mut table = IndexTable::new(&mut mem).unwrap();

        // One past the initial capacity forces a grow.
        for i in 0..17u32 {
            table
                .push(
                    &mut mem,
                    IndexEntry {
                        chunk_id: chunk_ids::VIDEO_FRAME,
                        flags: IndexEntry::KEYFRAME,
                        offset: 4 + i * 108,
                        size: 100 + i,
                    },
                )
                .unwrap();
        }

        assert_eq!(table.len(), 17);
        let bytes = table.as_bytes();
        for i in 0..17u32 {
            let at = i as usize * IndexTable::ENTRY_SIZE;
            let parsed = IndexEntry::read(&bytes[at..]).unwrap();
            assert_eq!(parsed.chunk_id, chunk_ids::VIDEO_FRAME);
            assert_eq!(parsed.offset, 4 + i * 108);
            assert_eq!(parsed.size, 100 + i);
        }
    }
}
