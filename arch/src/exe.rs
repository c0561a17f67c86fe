//! Executable image format.
//!
//! ```text
//! +--------+---------+-------------+------------+----------+------------------+
//! | magic  | version | entry_point | stack_size | bss_size | body ...         |
//! | 4 B    | u32     | u64         | u64        | u64      | words and data   |
//! +--------+---------+-------------+------------+----------+------------------+
//! ```
//!
//! All integers are little-endian. The loader places the body at
//! [`BASE_ADDRESS`] and reserves `bss_size` zeroed bytes right after it.

use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"VMXE";

/// Version of the header and opcode-word layout in [`crate::op`].
pub const FORMAT_VERSION: u32 = 1;

/// Bytes per instruction word.
pub const WORD_SIZE: i64 = 4;

/// Address of the first byte of the body once loaded.
pub const BASE_ADDRESS: i64 = 1024;

pub const DEFAULT_STACK_SIZE: u64 = 4096;

pub const HEADER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u32,
    pub entry_point: u64,
    pub stack_size: u64,
    pub bss_size: u64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Image too short: {0} bytes")]
    Truncated(usize),

    #[error("Bad magic: {0:02X?}")]
    BadMagic([u8; 4]),
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.entry_point.to_le_bytes());
        buf[16..24].copy_from_slice(&self.stack_size.to_le_bytes());
        buf[24..32].copy_from_slice(&self.bss_size.to_le_bytes());
        buf
    }

    pub fn decode(bin: &[u8]) -> Result<Self, HeaderError> {
        if bin.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated(bin.len()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bin[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::BadMagic(magic));
        }
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bin[at..at + 8]);
            u64::from_le_bytes(b)
        };
        let mut version = [0u8; 4];
        version.copy_from_slice(&bin[4..8]);
        Ok(Header {
            magic,
            version: u32::from_le_bytes(version),
            entry_point: u64_at(8),
            stack_size: u64_at(16),
            bss_size: u64_at(24),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let hdr = Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            entry_point: 0x0400,
            stack_size: DEFAULT_STACK_SIZE,
            bss_size: 16,
        };
        let bin = hdr.to_bytes();
        assert_eq!(&bin[0..4], b"VMXE");
        assert_eq!(&bin[4..8], &[1, 0, 0, 0]);
        assert_eq!(&bin[8..10], &[0x00, 0x04]);
        assert_eq!(bin[24], 16);
        assert_eq!(Header::decode(&bin), Ok(hdr));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(Header::decode(&[0; 8]), Err(HeaderError::Truncated(8)));
        let mut bin = [0u8; HEADER_SIZE];
        bin[0..4].copy_from_slice(b"ELF\0");
        assert_eq!(Header::decode(&bin), Err(HeaderError::BadMagic(*b"ELF\0")));
    }
}
