//! Plain storage devices: RAM and ROM.
//!
//! Both store bytes in address order; multi-byte accesses are
//! assembled in lane order (lowest address least significant), and
//! the bus takes care of big-endian regions.
use std::fmt::{self, Debug, Formatter};

use base::prelude::*;

use super::bus::{AccessFault, BusDevice};

fn load_lanes(bytes: &[u8], offset: u32, width: AccessWidth) -> u32 {
    let start = offset as usize;
    let end = start + width.bytes() as usize;
    bytes[start..end]
        .iter()
        .rev()
        .fold(0_u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn store_lanes(bytes: &mut [u8], offset: u32, width: AccessWidth, value: u32) {
    let start = offset as usize;
    let end = start + width.bytes() as usize;
    let mut v = value;
    for b in bytes[start..end].iter_mut() {
        *b = (v & 0xFF) as u8;
        v >>= 8;
    }
}

pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    /// Zero-filled RAM of `size` bytes.
    pub fn new(size: u32) -> Ram {
        Ram {
            bytes: vec![0; size as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy `data` into RAM starting at `offset`.  Returns `false`
    /// (and copies nothing) if it would not fit.
    pub fn load(&mut self, offset: u32, data: &[u8]) -> bool {
        let start = offset as usize;
        match start.checked_add(data.len()) {
            Some(end) if end <= self.bytes.len() => {
                self.bytes[start..end].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Debug for Ram {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ram")
            .field("size", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

// A region may be mapped larger than the storage behind it.
impl BusDevice for Ram {
    fn read(&mut self, offset: u32, width: AccessWidth) -> Result<u32, AccessFault> {
        if offset as usize + width.bytes() as usize > self.bytes.len() {
            return Err(AccessFault::UnsupportedWidth);
        }
        Ok(load_lanes(&self.bytes, offset, width))
    }

    fn write(&mut self, offset: u32, width: AccessWidth, value: u32) -> Result<(), AccessFault> {
        if offset as usize + width.bytes() as usize > self.bytes.len() {
            return Err(AccessFault::UnsupportedWidth);
        }
        store_lanes(&mut self.bytes, offset, width, value);
        Ok(())
    }
}

pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    pub fn new(contents: Vec<u8>) -> Rom {
        Rom { bytes: contents }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Debug for Rom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rom")
            .field("size", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl BusDevice for Rom {
    fn read(&mut self, offset: u32, width: AccessWidth) -> Result<u32, AccessFault> {
        if offset as usize + width.bytes() as usize > self.bytes.len() {
            return Err(AccessFault::UnsupportedWidth);
        }
        Ok(load_lanes(&self.bytes, offset, width))
    }

    fn write(&mut self, _offset: u32, _width: AccessWidth, _value: u32) -> Result<(), AccessFault> {
        Err(AccessFault::ReadOnly)
    }
}

#[test]
fn test_ram_lane_order() {
    let mut ram = Ram::new(8);
    ram.write(0, AccessWidth::Dword, 0x4433_2211).expect("in range");
    assert_eq!(ram.as_slice()[..4], [0x11, 0x22, 0x33, 0x44]);
    assert_eq!(ram.read(1, AccessWidth::Word), Ok(0x3322));
    assert_eq!(ram.read(3, AccessWidth::Byte), Ok(0x44));
}

#[test]
fn test_ram_load_bounds() {
    let mut ram = Ram::new(4);
    assert!(ram.load(2, &[1, 2]));
    assert!(!ram.load(3, &[1, 2]));
    assert_eq!(ram.as_slice(), &[0, 0, 1, 2]);
}

#[test]
fn test_device_rejects_access_beyond_its_storage() {
    let mut rom = Rom::new(vec![0xAA; 3]);
    assert_eq!(rom.read(2, AccessWidth::Word), Err(AccessFault::UnsupportedWidth));
    assert_eq!(rom.read(2, AccessWidth::Byte), Ok(0xAA));
    assert_eq!(rom.write(0, AccessWidth::Byte, 0), Err(AccessFault::ReadOnly));
}
