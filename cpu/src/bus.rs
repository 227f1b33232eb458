//! The system bus.
//!
//! The bus maps address ranges ("regions") to devices.  RAM, ROM and
//! peripheral register banks are all just devices: the bus never
//! needs to know what is behind a region, only where it starts, how
//! big it is and in what byte order its storage is arranged.
//!
//! Devices see accesses in *lane order*: the byte at the lowest
//! address is the least significant byte of the value.  For a
//! big-endian region the bus swaps bytes on the way in and out, so
//! callers always compute with plain integers.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use tracing::{event, Level};

use base::prelude::*;

/// Why a device refused an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFault {
    ReadOnly,
    /// The device does not implement accesses of this width.
    UnsupportedWidth,
}

/// Something which can be attached to the bus.  `offset` is relative
/// to the start of the region the device was registered for.
pub trait BusDevice {
    fn read(&mut self, offset: u32, width: AccessWidth) -> Result<u32, AccessFault>;

    fn write(&mut self, offset: u32, width: AccessWidth, value: u32) -> Result<(), AccessFault>;
}

/// Devices which are also driven from elsewhere (typically from a
/// timer callback) are shared with the bus through `Rc<RefCell<_>>`.
impl<T: BusDevice> BusDevice for Rc<RefCell<T>> {
    fn read(&mut self, offset: u32, width: AccessWidth) -> Result<u32, AccessFault> {
        self.borrow_mut().read(offset, width)
    }

    fn write(&mut self, offset: u32, width: AccessWidth, value: u32) -> Result<(), AccessFault> {
        self.borrow_mut().write(offset, width, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    NotMapped(u32),
    ReadOnly(u32),
    UnsupportedWidth { address: u32, width: AccessWidth },
    EmptyRegion { base: u32 },
    Overlap {
        base: u32,
        size: u32,
        existing_owner: String,
        existing_base: u32,
    },
    NoSuchRegion { base: u32, size: u32 },
}

impl Display for BusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            BusError::NotMapped(addr) => {
                write!(f, "address {addr:#08x} is not mapped")
            }
            BusError::ReadOnly(addr) => {
                write!(f, "address {addr:#08x} is mapped to read-only memory")
            }
            BusError::UnsupportedWidth { address, width } => {
                write!(
                    f,
                    "device at {address:#08x} does not support {width} accesses"
                )
            }
            BusError::EmptyRegion { base } => {
                write!(f, "cannot map an empty region at {base:#08x}")
            }
            BusError::Overlap {
                base,
                size,
                existing_owner,
                existing_base,
            } => write!(
                f,
                "region {base:#08x}+{size:#x} overlaps the region of {existing_owner} at {existing_base:#08x}"
            ),
            BusError::NoSuchRegion { base, size } => {
                write!(f, "there is no region {base:#08x}+{size:#x}")
            }
        }
    }
}

impl Error for BusError {}

struct Region {
    size: u32,
    endian: Endian,
    owner: String,
    device: Box<dyn BusDevice>,
}

impl Region {
    fn end(&self, base: u32) -> u64 {
        u64::from(base) + u64::from(self.size)
    }
}

impl Debug for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("size", &format_args!("{:#x}", self.size))
            .field("endian", &self.endian)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Regions are kept in a map keyed by base address; the region
/// containing an address is the last one starting at or below it.
#[derive(Debug, Default)]
pub struct Bus {
    regions: BTreeMap<u32, Region>,
}

impl Bus {
    pub fn new() -> Bus {
        Bus {
            regions: BTreeMap::new(),
        }
    }

    /// Attach `device` to `[base, base + size)`.
    ///
    /// # Errors
    ///
    /// Fails for an empty region, or one overlapping an existing
    /// region.  Both are configuration errors.
    pub fn register_region(
        &mut self,
        base: u32,
        size: u32,
        endian: Endian,
        owner: &str,
        device: Box<dyn BusDevice>,
    ) -> Result<(), BusError> {
        if size == 0 {
            return Err(BusError::EmptyRegion { base });
        }
        let end = u64::from(base) + u64::from(size);
        let below = self.regions.range(..=base).next_back();
        let above = self.regions.range(base..).next();
        for (existing_base, existing) in below.into_iter().chain(above) {
            let overlaps =
                u64::from(*existing_base) < end && u64::from(base) < existing.end(*existing_base);
            if overlaps {
                return Err(BusError::Overlap {
                    base,
                    size,
                    existing_owner: existing.owner.clone(),
                    existing_base: *existing_base,
                });
            }
        }
        event!(
            Level::DEBUG,
            "mapping {} at {:#08x}..{:#08x} ({:?})",
            owner,
            base,
            end,
            endian
        );
        self.regions.insert(
            base,
            Region {
                size,
                endian,
                owner: owner.to_string(),
                device,
            },
        );
        Ok(())
    }

    /// Detach the region registered at exactly `base` with `size`,
    /// handing back its device.
    ///
    /// # Errors
    ///
    /// `BusError::NoSuchRegion` if no such region was registered.
    pub fn unregister_region(
        &mut self,
        base: u32,
        size: u32,
    ) -> Result<Box<dyn BusDevice>, BusError> {
        match self.regions.get(&base) {
            Some(region) if region.size == size => {}
            _ => return Err(BusError::NoSuchRegion { base, size }),
        }
        match self.regions.remove(&base) {
            Some(region) => {
                event!(Level::DEBUG, "unmapped {} at {:#08x}", region.owner, base);
                Ok(region.device)
            }
            None => Err(BusError::NoSuchRegion { base, size }),
        }
    }

    /// The owner name of the region containing `address`.
    pub fn owner_of(&self, address: u32) -> Option<&str> {
        self.regions
            .range(..=address)
            .next_back()
            .filter(|(base, region)| u64::from(address) < region.end(**base))
            .map(|(_, region)| region.owner.as_str())
    }

    fn locate(&mut self, address: u32, width: AccessWidth) -> Result<(u32, &mut Region), BusError> {
        match self.regions.range_mut(..=address).next_back() {
            Some((base, region))
                if u64::from(address) + u64::from(width.bytes()) <= region.end(*base) =>
            {
                Ok((address - *base, region))
            }
            _ => Err(BusError::NotMapped(address)),
        }
    }

    fn fault(address: u32, width: AccessWidth, fault: AccessFault) -> BusError {
        match fault {
            AccessFault::ReadOnly => BusError::ReadOnly(address),
            AccessFault::UnsupportedWidth => BusError::UnsupportedWidth { address, width },
        }
    }

    /// # Errors
    ///
    /// Fails when nothing is mapped at `address` (for the whole
    /// access) or the device rejects the access.
    pub fn read(&mut self, address: u32, width: AccessWidth) -> Result<u32, BusError> {
        let (offset, region) = self.locate(address, width)?;
        let endian = region.endian;
        match region.device.read(offset, width) {
            Ok(raw) => Ok(endian.swap(raw & width.mask(), width)),
            Err(fault) => Err(Bus::fault(address, width, fault)),
        }
    }

    /// # Errors
    ///
    /// Fails when nothing is mapped at `address` (for the whole
    /// access) or the device rejects the access.
    pub fn write(&mut self, address: u32, width: AccessWidth, value: u32) -> Result<(), BusError> {
        let (offset, region) = self.locate(address, width)?;
        let raw = region.endian.swap(value & width.mask(), width);
        region
            .device
            .write(offset, width, raw)
            .map_err(|fault| Bus::fault(address, width, fault))
    }

    pub fn read8(&mut self, address: u32) -> Result<u8, BusError> {
        self.read(address, AccessWidth::Byte).map(|v| v as u8)
    }

    pub fn read16(&mut self, address: u32) -> Result<u16, BusError> {
        self.read(address, AccessWidth::Word).map(|v| v as u16)
    }

    pub fn read32(&mut self, address: u32) -> Result<u32, BusError> {
        self.read(address, AccessWidth::Dword)
    }

    pub fn write8(&mut self, address: u32, value: u8) -> Result<(), BusError> {
        self.write(address, AccessWidth::Byte, value.into())
    }

    pub fn write16(&mut self, address: u32, value: u16) -> Result<(), BusError> {
        self.write(address, AccessWidth::Word, value.into())
    }

    pub fn write32(&mut self, address: u32, value: u32) -> Result<(), BusError> {
        self.write(address, AccessWidth::Dword, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Ram, Rom};
    use test_strategy::proptest;

    fn bus_with_ram(endian: Endian) -> Bus {
        let mut bus = Bus::new();
        bus.register_region(0x1000, 0x100, endian, "ram", Box::new(Ram::new(0x100)))
            .expect("mapping should succeed");
        bus
    }

    #[test]
    fn test_round_trip_all_widths() {
        let mut bus = bus_with_ram(Endian::Little);
        bus.write8(0x1000, 0xAB).expect("mapped");
        bus.write16(0x1002, 0x1234).expect("mapped");
        bus.write32(0x1004, 0xDEAD_BEEF).expect("mapped");
        assert_eq!(bus.read8(0x1000), Ok(0xAB));
        assert_eq!(bus.read16(0x1002), Ok(0x1234));
        assert_eq!(bus.read32(0x1004), Ok(0xDEAD_BEEF));
        // Little-endian storage: low byte first.
        assert_eq!(bus.read8(0x1002), Ok(0x34));
        assert_eq!(bus.read16(0x1004), Ok(0xBEEF));
    }

    #[test]
    fn test_big_endian_region_swaps_bytes() {
        let mut bus = bus_with_ram(Endian::Big);
        bus.write16(0x1010, 0x1234).expect("mapped");
        assert_eq!(bus.read16(0x1010), Ok(0x1234));
        assert_eq!(bus.read8(0x1010), Ok(0x12));
        assert_eq!(bus.read8(0x1011), Ok(0x34));
        bus.write32(0x1020, 0x0102_0304).expect("mapped");
        assert_eq!(bus.read8(0x1020), Ok(0x01));
        assert_eq!(bus.read16(0x1022), Ok(0x0304));
        assert_eq!(bus.read32(0x1020), Ok(0x0102_0304));
    }

    #[test]
    fn test_unmapped_access() {
        let mut bus = bus_with_ram(Endian::Little);
        assert_eq!(bus.read16(0x0FFE), Err(BusError::NotMapped(0x0FFE)));
        assert_eq!(bus.write8(0x1100, 1), Err(BusError::NotMapped(0x1100)));
        // Straddling the end of the region is not mapped either.
        assert_eq!(bus.read32(0x10FE), Err(BusError::NotMapped(0x10FE)));
        assert_eq!(bus.read16(0x10FE), Ok(0));
    }

    #[test]
    fn test_overlapping_regions_are_rejected() {
        let mut bus = bus_with_ram(Endian::Little);
        for (base, size) in [(0x1000, 0x10), (0x0F00, 0x101), (0x10FF, 1), (0, u32::MAX)] {
            match bus.register_region(base, size, Endian::Little, "other", Box::new(Ram::new(16))) {
                Err(BusError::Overlap { existing_owner, .. }) => assert_eq!(existing_owner, "ram"),
                other => panic!("expected overlap for {base:#x}+{size:#x}, got {other:?}"),
            }
        }
        // Adjacent regions are fine.
        bus.register_region(0x1100, 0x10, Endian::Little, "above", Box::new(Ram::new(0x10)))
            .expect("adjacent above");
        bus.register_region(0x0F00, 0x100, Endian::Little, "below", Box::new(Ram::new(0x100)))
            .expect("adjacent below");
        assert_eq!(bus.owner_of(0x0FFF), Some("below"));
        assert_eq!(bus.owner_of(0x1000), Some("ram"));
        assert_eq!(bus.owner_of(0x1100), Some("above"));
        assert_eq!(bus.owner_of(0x1110), None);
    }

    #[test]
    fn test_empty_region_rejected() {
        let mut bus = Bus::new();
        assert_eq!(
            bus.register_region(0, 0, Endian::Little, "nothing", Box::new(Ram::new(0)))
                .map(|_| ()),
            Err(BusError::EmptyRegion { base: 0 })
        );
    }

    #[test]
    fn test_unregister() {
        let mut bus = bus_with_ram(Endian::Little);
        assert!(bus.unregister_region(0x1000, 0x10).is_err());
        assert!(bus.unregister_region(0x1000, 0x100).is_ok());
        assert_eq!(bus.read8(0x1000), Err(BusError::NotMapped(0x1000)));
        assert!(bus.unregister_region(0x1000, 0x100).is_err());
    }

    #[test]
    fn test_rom_rejects_writes() {
        let mut bus = Bus::new();
        bus.register_region(0, 4, Endian::Little, "rom", Box::new(Rom::new(vec![1, 2, 3, 4])))
            .expect("mapping should succeed");
        assert_eq!(bus.read16(2), Ok(0x0403));
        assert_eq!(bus.write16(2, 0), Err(BusError::ReadOnly(2)));
        assert_eq!(bus.read16(2), Ok(0x0403));
    }

    #[test]
    fn test_shared_device() {
        let ram = Rc::new(RefCell::new(Ram::new(16)));
        let mut bus = Bus::new();
        bus.register_region(0x40, 16, Endian::Little, "shared", Box::new(Rc::clone(&ram)))
            .expect("mapping should succeed");
        bus.write16(0x44, 0xCAFE).expect("mapped");
        assert_eq!(
            ram.borrow_mut().read(4, AccessWidth::Word),
            Ok(0xCAFE)
        );
    }

    #[proptest]
    fn word_round_trip(#[strategy(0_u32..0x7F)] index: u32, value: u16, big_endian: bool) {
        let endian = if big_endian { Endian::Big } else { Endian::Little };
        let mut bus = bus_with_ram(endian);
        let addr = 0x1000 + index * 2;
        bus.write16(addr, value).expect("mapped");
        assert_eq!(bus.read16(addr), Ok(value));
    }
}
