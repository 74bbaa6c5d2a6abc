//! Numeric encodings shared with the DWARF debug-info standard.
//!
//! Every value here is written verbatim into emitted metadata. Newtypes over
//! `u32` accept any raw value so vendor extensions pass through untouched;
//! the named constants only cover the values the standard defines.

use std::fmt;

use bitflags::bitflags;

macro_rules! raw_encoding {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$cmeta:meta])* $konst:ident = $val:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            $($(#[$cmeta])* pub const $konst: Self = Self($val);)*

            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Standard name of this value, if it is one of the named constants.
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$konst => Some(stringify!($konst)),)*
                    _ => None,
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "{:#x}", self.0),
                }
            }
        }
    };
}

raw_encoding! {
    /// `DW_ATE_*` base type encoding.
    TypeEncoding {
        ADDRESS = 0x1,
        BOOLEAN = 0x2,
        FLOAT = 0x4,
        SIGNED = 0x5,
        SIGNED_CHAR = 0x6,
        UNSIGNED = 0x7,
        UNSIGNED_CHAR = 0x8,
        IMAGINARY_FLOAT = 0x9,
        PACKED_DECIMAL = 0xa,
        NUMERIC_STRING = 0xb,
        EDITED = 0xc,
        SIGNED_FIXED = 0xd,
        UNSIGNED_FIXED = 0xe,
        DECIMAL_FLOAT = 0xf,
        UTF = 0x10,
        UCS = 0x11,
        ASCII = 0x12,
        COMPLEX_FLOAT = 0x31,
        LO_USER = 0x80,
        HI_USER = 0xff,
    }
}

raw_encoding! {
    /// `DW_LANG_*` source language id.
    SourceLanguage {
        C89 = 0x1,
        C = 0x2,
        ADA83 = 0x3,
        C_PLUS_PLUS = 0x4,
        FORTRAN77 = 0x7,
        C99 = 0xc,
        C_PLUS_PLUS_11 = 0x1a,
        RUST = 0x1c,
        C11 = 0x1d,
        C_PLUS_PLUS_14 = 0x21,
        LO_USER = 0x8000,
        HI_USER = 0xffff,
    }
}

raw_encoding! {
    /// `DW_TAG_*` code carried by basic types.
    DwTag {
        BASE_TYPE = 0x24,
        UNSPECIFIED_TYPE = 0x3b,
    }
}

raw_encoding! {
    /// `DW_CC_*` calling convention of a subroutine type.
    CallingConvention {
        NORMAL = 0x1,
        PROGRAM = 0x2,
        NOCALL = 0x3,
        PASS_BY_REFERENCE = 0x4,
        PASS_BY_VALUE = 0x5,
    }
}

bitflags! {
    /// `DIFlags` bit-set.
    ///
    /// Several names share a bit pattern (`PRIVATE`/`BIT0`, the three
    /// inheritance flags). They are kept as distinct names over the same
    /// bits; a stored value never records which alias produced it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct DiFlags: u32 {
        const ZERO = 0;
        const BIT0 = 1;
        const BIT1 = 2;
        const PRIVATE = 1;
        const PROTECTED = 2;
        const PUBLIC = 3;
        const FWD_DECL = 4;
        const APPLE_BLOCK = 8;
        const RESERVED_BIT4 = 16;
        const VIRTUAL = 32;
        const ARTIFICIAL = 64;
        const EXPLICIT = 128;
        const PROTOTYPED = 256;
        const OBJC_CLASS_COMPLETE = 512;
        const OBJECT_POINTER = 1024;
        const VECTOR = 2048;
        const STATIC_MEMBER = 4096;
        const LVALUE_REFERENCE = 8192;
        const RVALUE_REFERENCE = 16384;
        const EXPORT_SYMBOLS = 32768;
        const SINGLE_INHERITANCE = 65536;
        const MULTIPLE_INHERITANCE = 65536;
        const VIRTUAL_INHERITANCE = 65536;
        const INTRODUCED_VIRTUAL = 262144;
        const BIT_FIELD = 524288;
        const NO_RETURN = 1048576;
        const TYPE_PASS_BY_VALUE = 4194304;
        const TYPE_PASS_BY_REFERENCE = 8388608;
        const ENUM_CLASS = 16777216;
        const THUNK = 33554432;
        const NON_TRIVIAL = 67108864;
        const BIG_ENDIAN = 134217728;
        const LITTLE_ENDIAN = 268435456;
        const ALL_CALLS_DESCRIBED = 536870912;
    }
}

bitflags! {
    /// `DISubprogram` spFlags bit-set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SubprogramFlags: u32 {
        const VIRTUAL = 1;
        const PURE_VIRTUAL = 2;
        const LOCAL_TO_UNIT = 4;
        const DEFINITION = 8;
        const OPTIMIZED = 16;
        const PURE = 32;
        const ELEMENTAL = 64;
        const RECURSIVE = 128;
        const MAIN_SUBPROGRAM = 256;
        const DELETED = 512;
        const OBJC_DIRECT = 2048;
    }
}

impl DiFlags {
    /// Keep every bit of `raw`, including bits with no name.
    pub const fn from_raw(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }
}

impl SubprogramFlags {
    pub const fn from_raw(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }
}

/// How much debug information the backend materializes for a compile unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum EmissionKind {
    None = 0,
    #[default]
    Full = 1,
    LineTablesOnly = 2,
    DebugDirectivesOnly = 3,
}

/// Accelerator name table flavour recorded on a compile unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum NameTableKind {
    #[default]
    Default = 0,
    Gnu = 1,
    None = 2,
    Apple = 3,
}

impl EmissionKind {
    pub const fn raw(self) -> u32 {
        self as u32
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Full),
            2 => Some(Self::LineTablesOnly),
            3 => Some(Self::DebugDirectivesOnly),
            _ => None,
        }
    }
}

impl NameTableKind {
    pub const fn raw(self) -> u32 {
        self as u32
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Default),
            1 => Some(Self::Gnu),
            2 => Some(Self::None),
            3 => Some(Self::Apple),
            _ => None,
        }
    }
}

impl fmt::Display for EmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NoDebug",
            Self::Full => "FullDebug",
            Self::LineTablesOnly => "LineTablesOnly",
            Self::DebugDirectivesOnly => "DebugDirectivesOnly",
        })
    }
}

impl fmt::Display for NameTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "Default",
            Self::Gnu => "GNU",
            Self::None => "None",
            Self::Apple => "Apple",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_encoding_values() {
        assert_eq!(TypeEncoding::ADDRESS.raw(), 0x1);
        assert_eq!(TypeEncoding::BOOLEAN.raw(), 0x2);
        assert_eq!(TypeEncoding::COMPLEX_FLOAT.raw(), 0x31);
        assert_eq!(TypeEncoding::FLOAT.raw(), 0x4);
        assert_eq!(TypeEncoding::SIGNED.raw(), 0x5);
        assert_eq!(TypeEncoding::UNSIGNED.raw(), 0x7);
        assert_eq!(TypeEncoding::ASCII.raw(), 0x12);
        assert_eq!(TypeEncoding::LO_USER.raw(), 0x80);
        assert_eq!(TypeEncoding::HI_USER.raw(), 0xff);
    }

    #[test]
    fn unnamed_raw_values_pass_through() {
        let vendor = TypeEncoding::from(0x90);
        assert_eq!(u32::from(vendor), 0x90);
        assert_eq!(vendor.name(), None);
        assert_eq!(vendor.to_string(), "0x90");
        assert_eq!(TypeEncoding::SIGNED.to_string(), "SIGNED");
    }

    #[test]
    fn di_flag_aliases_share_bits() {
        assert_eq!(DiFlags::PRIVATE.bits(), DiFlags::BIT0.bits());
        assert_eq!(DiFlags::PROTECTED.bits(), DiFlags::BIT1.bits());
        assert_eq!(DiFlags::PUBLIC.bits(), 3);
        assert_eq!(DiFlags::SINGLE_INHERITANCE, DiFlags::MULTIPLE_INHERITANCE);
        assert_eq!(DiFlags::MULTIPLE_INHERITANCE, DiFlags::VIRTUAL_INHERITANCE);
        assert_eq!(DiFlags::VIRTUAL_INHERITANCE.bits(), 65536);
        assert_eq!(DiFlags::ALL_CALLS_DESCRIBED.bits(), 1 << 29);
    }

    #[test]
    fn unknown_flag_bits_retained() {
        // 1 << 18 is INTRODUCED_VIRTUAL, 1 << 17 has no name.
        let raw = (1 << 17) | (1 << 18) | 3;
        assert_eq!(DiFlags::from_raw(raw).bits(), raw);
        assert_eq!(SubprogramFlags::from_raw(1024 | 8).bits(), 1024 | 8);
    }

    #[test]
    fn subprogram_flag_values() {
        assert_eq!(SubprogramFlags::DEFINITION.bits(), 8);
        assert_eq!(SubprogramFlags::OPTIMIZED.bits(), 16);
        assert_eq!(SubprogramFlags::MAIN_SUBPROGRAM.bits(), 256);
        assert_eq!(SubprogramFlags::OBJC_DIRECT.bits(), 2048);
    }

    #[test]
    fn emission_and_name_table_kinds() {
        for raw in 0..4 {
            assert_eq!(EmissionKind::from_raw(raw).map(EmissionKind::raw), Some(raw));
            assert_eq!(NameTableKind::from_raw(raw).map(NameTableKind::raw), Some(raw));
        }
        assert_eq!(EmissionKind::from_raw(4), None);
        assert_eq!(NameTableKind::Gnu.raw(), 1);
        assert_eq!(EmissionKind::LineTablesOnly.raw(), 2);
    }

    #[test]
    fn source_language_ids() {
        assert_eq!(SourceLanguage::C.raw(), 0x2);
        assert_eq!(SourceLanguage::RUST.raw(), 0x1c);
        assert_eq!(SourceLanguage::from(0x8001).raw(), 0x8001);
    }
}
