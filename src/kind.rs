//! # Element Kinds
//!
//! The closed set of scalar storage types a dataset variable can carry. Every
//! array in the crate is tagged with exactly one [`ElementKind`]; the kind fixes
//! the element byte width and drives the few places that must interpret a
//! scalar rather than just relocate its bytes.
//!
//! The [`Element`] trait binds native Rust scalars to their kind so that typed
//! reads can check the tag before reinterpreting bytes.

use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad type class of an element kind, as reported by the dataset reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeClass {
    Integer,
    Float,
    Boolean,
}

/// One scalar storage type and its fixed byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    HSize,
    HSSize,
    HErr,
    HBool,
    /// Generic integer class with no native width attached; stored as 8 bytes.
    Integer,
}

impl ElementKind {
    pub const ALL: [ElementKind; 19] = [
        ElementKind::Char,
        ElementKind::SignedChar,
        ElementKind::UnsignedChar,
        ElementKind::Short,
        ElementKind::UnsignedShort,
        ElementKind::Int,
        ElementKind::UnsignedInt,
        ElementKind::Long,
        ElementKind::UnsignedLong,
        ElementKind::LongLong,
        ElementKind::UnsignedLongLong,
        ElementKind::Float,
        ElementKind::Double,
        ElementKind::LongDouble,
        ElementKind::HSize,
        ElementKind::HSSize,
        ElementKind::HErr,
        ElementKind::HBool,
        ElementKind::Integer,
    ];

    /// Size in bytes of a single element of this kind.
    pub const fn byte_width(self) -> usize {
        match self {
            ElementKind::Char
            | ElementKind::SignedChar
            | ElementKind::UnsignedChar
            | ElementKind::HBool => 1,
            ElementKind::Short | ElementKind::UnsignedShort => 2,
            ElementKind::Int
            | ElementKind::UnsignedInt
            | ElementKind::Float
            | ElementKind::HErr => 4,
            ElementKind::Long
            | ElementKind::UnsignedLong
            | ElementKind::LongLong
            | ElementKind::UnsignedLongLong
            | ElementKind::Double
            | ElementKind::HSize
            | ElementKind::HSSize
            | ElementKind::Integer => 8,
            ElementKind::LongDouble => 16,
        }
    }

    pub const fn type_class(self) -> TypeClass {
        match self {
            ElementKind::Float | ElementKind::Double | ElementKind::LongDouble => TypeClass::Float,
            ElementKind::HBool => TypeClass::Boolean,
            _ => TypeClass::Integer,
        }
    }

    pub fn is_float(self) -> bool {
        self.type_class() == TypeClass::Float
    }

    pub fn is_integer(self) -> bool {
        self.type_class() == TypeClass::Integer
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Char => "char",
            ElementKind::SignedChar => "signed_char",
            ElementKind::UnsignedChar => "unsigned_char",
            ElementKind::Short => "short",
            ElementKind::UnsignedShort => "unsigned_short",
            ElementKind::Int => "int",
            ElementKind::UnsignedInt => "unsigned_int",
            ElementKind::Long => "long",
            ElementKind::UnsignedLong => "unsigned_long",
            ElementKind::LongLong => "long_long",
            ElementKind::UnsignedLongLong => "unsigned_long_long",
            ElementKind::Float => "float",
            ElementKind::Double => "double",
            ElementKind::LongDouble => "long_double",
            ElementKind::HSize => "hsize",
            ElementKind::HSSize => "hssize",
            ElementKind::HErr => "herr",
            ElementKind::HBool => "hbool",
            ElementKind::Integer => "integer",
        }
    }

    /// Interprets one element's native-endian bytes as a printable scalar.
    ///
    /// Returns `None` when `bytes` is not exactly one element wide, or for
    /// [`ElementKind::LongDouble`], which has no native Rust counterpart.
    pub fn decode(self, bytes: &[u8]) -> Option<Scalar> {
        if bytes.len() != self.byte_width() {
            return None;
        }
        let scalar = match self {
            ElementKind::Char | ElementKind::UnsignedChar => Scalar::Unsigned(u64::from(bytes[0])),
            ElementKind::SignedChar => Scalar::Signed(i64::from(read::<i8>(bytes))),
            ElementKind::Short => Scalar::Signed(i64::from(read::<i16>(bytes))),
            ElementKind::UnsignedShort => Scalar::Unsigned(u64::from(read::<u16>(bytes))),
            ElementKind::Int | ElementKind::HErr => Scalar::Signed(i64::from(read::<i32>(bytes))),
            ElementKind::UnsignedInt => Scalar::Unsigned(u64::from(read::<u32>(bytes))),
            ElementKind::Long
            | ElementKind::LongLong
            | ElementKind::HSSize
            | ElementKind::Integer => Scalar::Signed(read::<i64>(bytes)),
            ElementKind::UnsignedLong | ElementKind::UnsignedLongLong | ElementKind::HSize => {
                Scalar::Unsigned(read::<u64>(bytes))
            }
            ElementKind::Float => Scalar::Float(f64::from(read::<f32>(bytes))),
            ElementKind::Double => Scalar::Float(read::<f64>(bytes)),
            ElementKind::HBool => Scalar::Bool(bytes[0] != 0),
            ElementKind::LongDouble => return None,
        };
        Some(scalar)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn read<T: Pod>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(bytes)
}

/// A decoded scalar value, widened to the largest type of its class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Signed(v) => v as f64,
            Scalar::Unsigned(v) => v as f64,
            Scalar::Float(v) => v,
            Scalar::Bool(v) => f64::from(u8::from(v)),
        }
    }
}

impl fmt::Display for Scalar {
    /// Integers print bare, floats with six decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Signed(v) => write!(f, "{}", v),
            Scalar::Unsigned(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{:.6}", v),
            Scalar::Bool(v) => write!(f, "{}", u8::from(*v)),
        }
    }
}

/// A native scalar type that can be read out of an array of its kind.
pub trait Element: Pod {
    const KIND: ElementKind;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;
        })*
    };
}

impl_element! {
    i8 => SignedChar,
    u8 => UnsignedChar,
    i16 => Short,
    u16 => UnsignedShort,
    i32 => Int,
    u32 => UnsignedInt,
    i64 => LongLong,
    u64 => UnsignedLongLong,
    f32 => Float,
    f64 => Double,
}

/// Returns true when an array of `kind` may be read as `T`.
///
/// Kinds sharing a width and representation with `T::KIND` are accepted, so an
/// `HSize` array reads as `u64` and a `Long` array as `i64`.
pub fn readable_as<T: Element>(kind: ElementKind) -> bool {
    if kind == T::KIND {
        return true;
    }
    matches!(
        (T::KIND, kind),
        (ElementKind::LongLong, ElementKind::Long | ElementKind::HSSize | ElementKind::Integer)
            | (ElementKind::UnsignedLongLong, ElementKind::UnsignedLong | ElementKind::HSize)
            | (ElementKind::Int, ElementKind::HErr)
            | (ElementKind::UnsignedChar, ElementKind::Char | ElementKind::HBool)
    )
}
