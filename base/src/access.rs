//! Access widths and byte orders shared by the bus and the ALU.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The size of a single bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessWidth {
    Byte,
    Word,
    Dword,
}

impl AccessWidth {
    pub const fn bytes(self) -> u32 {
        match self {
            AccessWidth::Byte => 1,
            AccessWidth::Word => 2,
            AccessWidth::Dword => 4,
        }
    }

    pub const fn mask(self) -> u32 {
        match self {
            AccessWidth::Byte => 0xFF,
            AccessWidth::Word => 0xFFFF,
            AccessWidth::Dword => 0xFFFF_FFFF,
        }
    }

    pub const fn sign_bit(self) -> u32 {
        match self {
            AccessWidth::Byte => 0x80,
            AccessWidth::Word => 0x8000,
            AccessWidth::Dword => 0x8000_0000,
        }
    }
}

impl Display for AccessWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessWidth::Byte => "8-bit",
            AccessWidth::Word => "16-bit",
            AccessWidth::Dword => "32-bit",
        })
    }
}

/// The byte order of the storage behind a bus region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Convert a value between "lane" order (least significant byte
    /// at the lowest address) and this byte order.  The conversion is
    /// its own inverse.
    pub const fn swap(self, value: u32, width: AccessWidth) -> u32 {
        match (self, width) {
            (Endian::Little, _) | (Endian::Big, AccessWidth::Byte) => value,
            (Endian::Big, AccessWidth::Word) => (value as u16).swap_bytes() as u32,
            (Endian::Big, AccessWidth::Dword) => value.swap_bytes(),
        }
    }
}

#[test]
fn test_swap() {
    assert_eq!(Endian::Little.swap(0x1234, AccessWidth::Word), 0x1234);
    assert_eq!(Endian::Big.swap(0x1234, AccessWidth::Word), 0x3412);
    assert_eq!(Endian::Big.swap(0x12, AccessWidth::Byte), 0x12);
    assert_eq!(
        Endian::Big.swap(0x1234_5678, AccessWidth::Dword),
        0x7856_3412
    );
}
