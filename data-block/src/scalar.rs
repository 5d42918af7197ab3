//! Reference to a single non-null element of an array

use std::fmt::Display;
use std::hash::{Hash, Hasher};

use crate::types::PhysicalType;

/// Reference to a single element. `NULL` is represented by the absence of the
/// [`ScalarRef`], i.e. `Option<ScalarRef>`
#[derive(Debug, Clone, Copy)]
pub enum ScalarRef<'a> {
    /// Boolean
    Boolean(bool),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// 64-bit float number
    Float64(f64),
    /// Utf-8 string
    String(&'a str),
}

impl ScalarRef<'_> {
    /// Physical type of the element
    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            Self::Boolean(_) => PhysicalType::Boolean,
            Self::Int32(_) => PhysicalType::Int32,
            Self::Int64(_) => PhysicalType::Int64,
            Self::Float64(_) => PhysicalType::Float64,
            Self::String(_) => PhysicalType::String,
        }
    }

    /// Widen the integer element to `i64`. Returns `None` for non integer elements
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int32(v) => Some(v as i64),
            Self::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// Convert the numeric element to `f64`. Returns `None` for non numeric elements
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int32(v) => Some(v as f64),
            Self::Int64(v) => Some(v as f64),
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }
}

/// Floats are compared by their bit pattern, `NaN` equals `NaN` and `0.0` does
/// not equal `-0.0`. It keeps the equality consistent with [`Hash`]
impl PartialEq for ScalarRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(lhs), Self::Boolean(rhs)) => lhs == rhs,
            (Self::Int32(lhs), Self::Int32(rhs)) => lhs == rhs,
            (Self::Int64(lhs), Self::Int64(rhs)) => lhs == rhs,
            (Self::Float64(lhs), Self::Float64(rhs)) => lhs.to_bits() == rhs.to_bits(),
            (Self::String(lhs), Self::String(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Eq for ScalarRef<'_> {}

impl Hash for ScalarRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Boolean(v) => v.hash(state),
            Self::Int32(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
        }
    }
}

impl Display for ScalarRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_equality_uses_bits() {
        assert_eq!(ScalarRef::Float64(f64::NAN), ScalarRef::Float64(f64::NAN));
        assert_ne!(ScalarRef::Float64(0.0), ScalarRef::Float64(-0.0));
        assert_ne!(ScalarRef::Int32(1), ScalarRef::Int64(1));
    }
}
