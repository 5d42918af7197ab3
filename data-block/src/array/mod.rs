//! [`Array`] is the memory format of the columnar storage.
//!
//! Arrays are growable with [`Array::push`] and slot addressable with
//! [`Array::set`]. Slot addressed writers create the array with
//! [`Array::new_nulls`] and overwrite the slots they own

pub mod boolean;
pub mod primitive;
pub mod string;

use crate::bitmap::Bitmap;
use crate::macros::for_all_variants;
use crate::private::Sealed;
use crate::scalar::ScalarRef;
use crate::types::{LogicalType, PhysicalType};
pub use boolean::BooleanArray;
pub use primitive::*;
use snafu::Snafu;
use std::fmt::Debug;
pub use string::StringArray;

#[allow(missing_docs)]
#[derive(Debug, Snafu)]
pub enum ArrayError {
    #[snafu(display(
        "Invalid logical type `{logical_type:?}({})` passed to creating a new array `{array_name}` that has `{array_physical_type}`",
        logical_type.physical_type(),
    ))]
    InvalidLogicalType {
        array_name: &'static str,
        array_physical_type: PhysicalType,
        logical_type: LogicalType,
    },
    #[snafu(display("Can not write element of `{element}` into `ArrayImpl::{array}`"))]
    TypeMismatch {
        array: &'static str,
        element: PhysicalType,
    },
    #[snafu(display("Can not copy element of `ArrayImpl::{source_array}` into `ArrayImpl::{array}`"))]
    CopyMismatch {
        array: &'static str,
        source_array: &'static str,
    },
    #[snafu(display("Index `{index}` is out of range, the array only has `{len}` elements"))]
    IndexOutOfRange { index: usize, len: usize },
    #[snafu(display(
        "Writing `{required}` bytes exceeds the byte budget of the array. Used: `{used}`, budget: `{limit}`"
    ))]
    ByteCapacityExceeded {
        required: usize,
        used: usize,
        limit: usize,
    },
}

type Result<T> = std::result::Result<T, ArrayError>;

/// A trait over all arrays
pub trait Array: Sealed + Debug + 'static + Sized {
    /// Physical type of the array
    const PHYSICAL_TYPE: PhysicalType;

    /// Name of the array, used in error messages
    const NAME: &'static str;

    /// Reference to the element stored in the array
    type ElementRef<'a>: Copy + Debug + PartialEq;

    /// Create a new [`Array`] that has `len` elements, all of them are `NULL`
    fn new_nulls(logical_type: LogicalType, len: usize) -> Result<Self>;

    /// Get the number of elements in the [`Array`]
    fn len(&self) -> usize;

    /// Returns `true` if the [`Array`] contains no elements
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the logical type of the array
    fn logical_type(&self) -> &LogicalType;

    /// Get the validity, it always has [`Self::len`] bits
    fn validity(&self) -> &Bitmap;

    /// Returns a reference to the element at the given index. It will panic if the index
    /// out of bounds
    fn get(&self, index: usize) -> Option<Self::ElementRef<'_>>;

    /// Append the element to the end of the array
    fn push(&mut self, element: Option<Self::ElementRef<'_>>) -> Result<()>;

    /// Overwrite the element at `index`
    fn set(&mut self, index: usize, element: Option<Self::ElementRef<'_>>) -> Result<()>;

    /// Clear the array
    fn clear(&mut self);

    /// Get the iterator of the array
    #[inline]
    fn iter(&self) -> impl Iterator<Item = Option<Self::ElementRef<'_>>> {
        (0..self.len()).map(|index| self.get(index))
    }
}

/// Check the logical type matches the array `A`
#[inline]
pub(crate) fn check_logical_type<A: Array>(logical_type: &LogicalType) -> Result<()> {
    snafu::ensure!(
        logical_type.physical_type() == A::PHYSICAL_TYPE,
        InvalidLogicalTypeSnafu {
            array_name: A::NAME,
            array_physical_type: A::PHYSICAL_TYPE,
            logical_type: logical_type.clone(),
        }
    );
    Ok(())
}

#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    snafu::ensure!(index < len, IndexOutOfRangeSnafu { index, len });
    Ok(())
}

macro_rules! array_impl {
    ($({$variant:ident, $array_ty:ty}),+) => {
        /// Implementations of the [`Array`], enum dispatch
        #[derive(Debug)]
        pub enum ArrayImpl {
            $(
                #[doc = concat!("Array of `", stringify!($variant), "`")]
                $variant($array_ty)
            ),+
        }

        impl ArrayImpl {
            /// Create a new empty [`ArrayImpl`] based on the [`LogicalType`]
            #[inline]
            pub fn new(logical_type: LogicalType) -> Self {
                Self::new_nulls(logical_type, 0)
            }

            /// Create a new [`ArrayImpl`] that has `len` `NULL`s
            pub fn new_nulls(logical_type: LogicalType, len: usize) -> Self {
                match logical_type.physical_type() {
                    $(
                        PhysicalType::$variant => {
                            let array = <$array_ty>::new_nulls(logical_type, len)
                                .expect("Physical type is derived from the logical type");
                            Self::$variant(array)
                        }
                    )+
                }
            }

            /// Get the number of elements in the Array
            pub fn len(&self) -> usize {
                match self {
                    $(
                        Self::$variant(array) => array.len(),
                    )+
                }
            }

            /// Returns `true` if the Array contains no elements
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Get ident of the array
            pub fn ident(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant(_) => stringify!($variant),
                    )+
                }
            }

            /// Return the [`LogicalType`] of the array
            pub fn logical_type(&self) -> &LogicalType {
                match self {
                    $(
                        Self::$variant(array) => array.logical_type(),
                    )+
                }
            }

            /// Get the validity bitmap
            pub fn validity(&self) -> &Bitmap {
                match self {
                    $(
                        Self::$variant(array) => array.validity(),
                    )+
                }
            }

            /// Get element ref. It will panic if the index out of bounds
            pub fn get(&self, index: usize) -> Option<ScalarRef<'_>> {
                match self {
                    $(
                        Self::$variant(array) => array.get(index).map(ScalarRef::$variant),
                    )+
                }
            }

            /// Append the element to the end of the array
            ///
            /// If the element does not have the physical type of the array, return error
            pub fn push(&mut self, element: Option<ScalarRef<'_>>) -> Result<()> {
                match (self, element) {
                    $(
                        (Self::$variant(array), None) => array.push(None),
                        (Self::$variant(array), Some(ScalarRef::$variant(element))) => {
                            array.push(Some(element))
                        }
                    )+
                    (array, Some(element)) => TypeMismatchSnafu {
                        array: array.ident(),
                        element: element.physical_type(),
                    }
                    .fail(),
                }
            }

            /// Overwrite the element at `index`
            ///
            /// If the element does not have the physical type of the array, return error
            pub fn set(&mut self, index: usize, element: Option<ScalarRef<'_>>) -> Result<()> {
                match (self, element) {
                    $(
                        (Self::$variant(array), None) => array.set(index, None),
                        (Self::$variant(array), Some(ScalarRef::$variant(element))) => {
                            array.set(index, Some(element))
                        }
                    )+
                    (array, Some(element)) => TypeMismatchSnafu {
                        array: array.ident(),
                        element: element.physical_type(),
                    }
                    .fail(),
                }
            }

            /// Copy `source[source_index]` into `self[index]`
            pub fn set_from(
                &mut self,
                index: usize,
                source: &ArrayImpl,
                source_index: usize,
            ) -> Result<()> {
                match (self, source) {
                    $(
                        (Self::$variant(lhs), Self::$variant(rhs)) => {
                            lhs.set(index, rhs.get(source_index))
                        }
                    )+
                    (lhs, rhs) => CopyMismatchSnafu {
                        array: lhs.ident(),
                        source_array: rhs.ident(),
                    }
                    .fail(),
                }
            }

            /// Clear the array
            pub fn clear(&mut self) {
                match self {
                    $(
                        Self::$variant(array) => array.clear(),
                    )+
                }
            }
        }

        $(
            impl From<$array_ty> for ArrayImpl {
                #[inline]
                fn from(array: $array_ty) -> Self {
                    Self::$variant(array)
                }
            }
        )+
    };
}

for_all_variants!(array_impl);

impl ArrayImpl {
    /// Limit the number of bytes the variable width array can hold. It is a no-op
    /// for the fixed width arrays
    #[inline]
    pub fn set_byte_limit(&mut self, limit: Option<usize>) {
        if let Self::String(array) = self {
            array.set_byte_limit(limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_array_impl_push_and_set() {
        let mut array = ArrayImpl::new_nulls(LogicalType::BigInt, 2);
        array.set(1, Some(ScalarRef::Int64(7))).unwrap();
        array.push(Some(ScalarRef::Int64(-3))).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(0), None);
        assert_eq!(array.get(1), Some(ScalarRef::Int64(7)));
        assert_eq!(array.get(2), Some(ScalarRef::Int64(-3)));
        assert_eq!(array.validity().count_zeros(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let mut array = ArrayImpl::new(LogicalType::Integer);
        let err = array.push(Some(ScalarRef::String("curry"))).unwrap_err();
        expect!["Can not write element of `PhysicalType::String` into `ArrayImpl::Int32`"]
            .assert_eq(&err.to_string());

        let source = ArrayImpl::from(StringArray::from_iter([Some("a")]));
        let err = array.set_from(0, &source, 0).unwrap_err();
        expect!["Can not copy element of `ArrayImpl::String` into `ArrayImpl::Int32`"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn test_set_from() {
        let source = ArrayImpl::from(Int32Array::from_iter([Some(1), None, Some(3)]));
        let mut target = ArrayImpl::new_nulls(LogicalType::Integer, 3);
        target.set(1, Some(ScalarRef::Int32(9))).unwrap();
        target.set_from(0, &source, 2).unwrap();
        target.set_from(1, &source, 1).unwrap();
        assert_eq!(target.get(0), Some(ScalarRef::Int32(3)));
        assert_eq!(target.get(1), None);
        assert_eq!(target.get(2), None);
    }
}
