//! Parameter kind tags and qualifier flags

use std::fmt;

/// Coarse type category of an event parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ParamKind {
    /// Not representable as an event parameter
    #[default]
    Undefined = 0,
    /// Boolean
    Boolean = 1,
    /// Unsigned 8-bit integer
    Byte = 2,
    /// Signed 32-bit integer
    Int32 = 3,
    /// Signed 64-bit integer
    Int64 = 4,
    /// 32-bit float
    Float = 5,
    /// 64-bit float
    Double = 6,
    /// Owned string
    String = 7,
    /// Identifier
    Name = 8,
    /// Display text
    Text = 9,
    /// Plain value aggregate with a registry entry
    Aggregate = 10,
    /// Enumeration with a registry entry
    Enum = 11,
    /// Reference to a managed object
    Object = 12,
    /// Ordered sequence
    Array = 13,
    /// Unordered unique set
    Set = 14,
    /// Key/value map
    Map = 15,
}

impl ParamKind {
    /// Kinds whose descriptors may link to a type registry entry
    pub fn is_linked(self) -> bool {
        matches!(self, ParamKind::Aggregate | ParamKind::Enum | ParamKind::Object)
    }

    /// Kinds that accept arguments of a registered subtype
    ///
    /// Object subtypes share the slot storage; aggregate subtypes also need a
    /// registered conversion to the ancestor.
    pub fn accepts_subtypes(self) -> bool {
        matches!(self, ParamKind::Aggregate | ParamKind::Object)
    }
}

/// Qualifier bits on a parameter
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParamFlags(u8);

impl ParamFlags {
    /// No qualifiers
    pub const NONE: ParamFlags = ParamFlags(0);
    /// Passed by reference
    pub const REFERENCE: ParamFlags = ParamFlags(1);
    /// Passed as a pointer
    pub const POINTER: ParamFlags = ParamFlags(2);
    /// Const-qualified
    pub const CONST: ParamFlags = ParamFlags(4);

    /// Raw flag bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether all bits of `other` are set
    pub const fn contains(self, other: ParamFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets
    pub const fn union(self, other: ParamFlags) -> ParamFlags {
        ParamFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for ParamFlags {
    type Output = ParamFlags;

    fn bitor(self, rhs: ParamFlags) -> ParamFlags {
        self.union(rhs)
    }
}

impl fmt::Debug for ParamFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(ParamFlags::REFERENCE) {
            parts.push("REFERENCE");
        }
        if self.contains(ParamFlags::POINTER) {
            parts.push("POINTER");
        }
        if self.contains(ParamFlags::CONST) {
            parts.push("CONST");
        }
        if parts.is_empty() {
            parts.push("NONE");
        }
        write!(f, "ParamFlags({})", parts.join(" | "))
    }
}
