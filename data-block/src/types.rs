//! Logical and physical types

use std::fmt::Display;

/// Physical type has a one-to-one mapping to each array implementation
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    /// Boolean
    Boolean,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 64-bit float number
    Float64,
    /// Variable length Utf-8 String
    String,
}

impl Display for PhysicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PhysicalType::{:?}", self)
    }
}

/// All of the supported logical types. Different logical types may have same
/// [`PhysicalType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Boolean value represent `true` or `false`
    Boolean,
    /// Signed 32-bit integer, also known as `INTEGER`
    Integer,
    /// Signed 64-bit integer, also known as `BIGINT`
    BigInt,
    /// 64-bit float number, also known as `DOUBLE`
    Double,
    /// Variable length Utf-8 String, also known as `VARCHAR`
    VarChar,
}

impl LogicalType {
    /// Get the physical type of the logical type
    #[inline]
    pub const fn physical_type(&self) -> PhysicalType {
        match self {
            Self::Boolean => PhysicalType::Boolean,
            Self::Integer => PhysicalType::Int32,
            Self::BigInt => PhysicalType::Int64,
            Self::Double => PhysicalType::Float64,
            Self::VarChar => PhysicalType::String,
        }
    }

    /// Returns true if the values of this type do not have fixed byte width
    #[inline]
    pub const fn is_variable_width(&self) -> bool {
        matches!(self.physical_type(), PhysicalType::String)
    }
}

impl Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::VarChar => "VARCHAR",
        };
        f.write_str(name)
    }
}
