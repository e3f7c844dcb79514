//! Byte-addressed little-endian memory behind the [`Bus`] trait.
//!
//! Data accesses are forgiving: reads outside the bound region yield zero
//! and writes are discarded. Only instruction fetch treats an out-of-range
//! address as fatal, and that check lives in the fetch stage.

#![allow(clippy::cast_possible_truncation)]

use crate::halt::ImageError;

/// Little-endian byte-addressed memory as seen by load/store handlers.
pub trait Bus {
    /// Reads one byte; zero when out of range.
    fn read8(&self, addr: u32) -> u8;

    /// Writes one byte; discarded when out of range.
    fn write8(&mut self, addr: u32, value: u8);

    /// Size of the addressable region in bytes.
    fn len(&self) -> usize;

    /// Whether the region is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian 16-bit read assembled from byte reads.
    fn read16(&self, addr: u32) -> u16 {
        u16::from(self.read8(addr)) | u16::from(self.read8(addr.wrapping_add(1))) << 8
    }

    /// Little-endian 16-bit write.
    fn write16(&mut self, addr: u32, value: u16) {
        self.write8(addr, value as u8);
        self.write8(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Little-endian 32-bit read assembled from byte reads.
    fn read32(&self, addr: u32) -> u32 {
        u32::from(self.read8(addr))
            | u32::from(self.read8(addr.wrapping_add(1))) << 8
            | u32::from(self.read8(addr.wrapping_add(2))) << 16
            | u32::from(self.read8(addr.wrapping_add(3))) << 24
    }

    /// Little-endian 32-bit write.
    fn write32(&mut self, addr: u32, value: u32) {
        self.write8(addr, value as u8);
        self.write8(addr.wrapping_add(1), (value >> 8) as u8);
        self.write8(addr.wrapping_add(2), (value >> 16) as u8);
        self.write8(addr.wrapping_add(3), (value >> 24) as u8);
    }
}

/// A flat byte vector implementing [`Bus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRam {
    bytes: Vec<u8>,
}

impl FlatRam {
    /// Allocates `size` zeroed bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Copies `image` into memory starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::OutOfBounds`] when the image does not fit; no
    /// bytes are written in that case.
    pub fn load_image(&mut self, addr: u32, image: &[u8]) -> Result<(), ImageError> {
        let start = addr as usize;
        let end = start.checked_add(image.len());
        match end {
            Some(end) if end <= self.bytes.len() => {
                self.bytes[start..end].copy_from_slice(image);
                Ok(())
            }
            _ => Err(ImageError::OutOfBounds {
                addr,
                len: image.len(),
                memory: self.bytes.len(),
            }),
        }
    }

    /// Zeroes all bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Raw contents, for snapshots and inspection.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Bus for FlatRam {
    fn read8(&self, addr: u32) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write8(&mut self, addr: u32, value: u8) {
        if let Some(slot) = self.bytes.get_mut(addr as usize) {
            *slot = value;
        }
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }
}
