//! [`PrimitiveArray`] that stores fixed byte-width data

use super::{Array, Result, check_index, check_logical_type};
use std::fmt::Debug;

use crate::bitmap::Bitmap;
use crate::macros::for_all_primitive_types;
use crate::private::Sealed;
use crate::types::{LogicalType, PhysicalType};

/// Trait for types that can be placed on the [`PrimitiveArray`]
pub trait PrimitiveType: Sealed + Copy + Default + Debug + PartialEq + 'static {
    /// Physical type of this primitive type
    const PHYSICAL_TYPE: PhysicalType;
    /// Default logical type of this primitive type
    const LOGICAL_TYPE: LogicalType;
    /// Name of the array that stores this type
    const ARRAY_NAME: &'static str;
}

macro_rules! impl_primitive_type {
    ($({$variant:ident, $primitive_element_ty:ty, $lt:ident}),*) => {
        $(
            impl Sealed for $primitive_element_ty {}

            impl PrimitiveType for $primitive_element_ty {
                const PHYSICAL_TYPE: PhysicalType = PhysicalType::$variant;
                const LOGICAL_TYPE: LogicalType = LogicalType::$lt;
                const ARRAY_NAME: &'static str = concat!(stringify!($variant), "Array");
            }

            paste::paste! {
                #[doc = concat!("A [`PrimitiveArray`] of [`", stringify!($primitive_element_ty), "`]")]
                pub type [<$variant Array>] = PrimitiveArray<$primitive_element_ty>;
            }
        )*
    };
}

for_all_primitive_types!(impl_primitive_type);

/// [`PrimitiveArray`] that stores fixed byte-width data, such as `i32` or `f64`.
/// The values behind the `NULL`s are `T::default()`
pub struct PrimitiveArray<T: PrimitiveType> {
    logical_type: LogicalType,
    data: Vec<T>,
    validity: Bitmap,
}

impl<T: PrimitiveType> PrimitiveArray<T> {
    /// Get the values of the array
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Construct [`Self`] from iterator of values
    pub fn from_values_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let data = iter.into_iter().collect::<Vec<_>>();
        Self {
            logical_type: T::LOGICAL_TYPE,
            validity: Bitmap::from_elem(true, data.len()),
            data,
        }
    }

    /// Change the logical type of the array, the physical type should not change
    pub fn with_logical_type(mut self, logical_type: LogicalType) -> Result<Self> {
        check_logical_type::<Self>(&logical_type)?;
        self.logical_type = logical_type;
        Ok(self)
    }
}

impl<T: PrimitiveType> Sealed for PrimitiveArray<T> {}

impl<T: PrimitiveType> Debug for PrimitiveArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{ len: {}, data: ", T::ARRAY_NAME, self.len())?;
        f.debug_list().entries(self.iter()).finish()?;
        write!(f, " }}")
    }
}

impl<T: PrimitiveType> Array for PrimitiveArray<T> {
    const PHYSICAL_TYPE: PhysicalType = T::PHYSICAL_TYPE;

    const NAME: &'static str = T::ARRAY_NAME;

    type ElementRef<'a> = T;

    fn new_nulls(logical_type: LogicalType, len: usize) -> Result<Self> {
        check_logical_type::<Self>(&logical_type)?;
        Ok(Self {
            logical_type,
            data: vec![T::default(); len],
            validity: Bitmap::from_elem(false, len),
        })
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    #[inline]
    fn validity(&self) -> &Bitmap {
        &self.validity
    }

    #[inline]
    fn get(&self, index: usize) -> Option<T> {
        self.validity.get(index).then(|| self.data[index])
    }

    #[inline]
    fn push(&mut self, element: Option<T>) -> Result<()> {
        self.data.push(element.unwrap_or_default());
        self.validity.push(element.is_some());
        Ok(())
    }

    #[inline]
    fn set(&mut self, index: usize, element: Option<T>) -> Result<()> {
        check_index(index, self.len())?;
        self.data[index] = element.unwrap_or_default();
        self.validity.set(index, element.is_some());
        Ok(())
    }

    fn clear(&mut self) {
        self.data.clear();
        self.validity.clear();
    }
}

impl<T: PrimitiveType> FromIterator<Option<T>> for PrimitiveArray<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (low, _) = iter.size_hint();
        let mut data = Vec::with_capacity(low);
        let validity = iter
            .map(|element| {
                data.push(element.unwrap_or_default());
                element.is_some()
            })
            .collect::<Bitmap>();

        Self {
            logical_type: T::LOGICAL_TYPE,
            data,
            validity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_iter() {
        let array = Int64Array::from_iter([Some(3), None, Some(-1)]);
        assert_eq!(array.len(), 3);
        assert_eq!(array.values(), &[3, 0, -1]);
        assert_eq!(array.iter().collect::<Vec<_>>(), [Some(3), None, Some(-1)]);
        assert_eq!(array.logical_type(), &LogicalType::BigInt);
    }

    #[test]
    fn test_set_out_of_range() {
        let mut array = Float64Array::new_nulls(LogicalType::Double, 2).unwrap();
        array.set(1, Some(0.5)).unwrap();
        assert_eq!(array.get(1), Some(0.5));
        assert!(array.set(2, Some(1.0)).is_err());
    }

    #[test]
    fn test_invalid_logical_type() {
        assert!(Int32Array::new_nulls(LogicalType::VarChar, 1).is_err());
        assert!(
            Int64Array::from_values_iter([1, 2])
                .with_logical_type(LogicalType::Integer)
                .is_err()
        );
    }
}
