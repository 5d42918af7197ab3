//! [`BooleanArray`], values are stored in the [`Bitmap`]

use super::{Array, Result, check_index, check_logical_type};
use crate::bitmap::Bitmap;
use crate::private::Sealed;
use crate::types::{LogicalType, PhysicalType};
use std::fmt::Debug;

/// Array of boolean
pub struct BooleanArray {
    logical_type: LogicalType,
    data: Bitmap,
    validity: Bitmap,
}

impl Sealed for BooleanArray {}

impl Debug for BooleanArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BooleanArray {{ len: {}, data: ", self.len())?;
        f.debug_list().entries(self.iter()).finish()?;
        write!(f, " }}")
    }
}

impl Array for BooleanArray {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Boolean;

    const NAME: &'static str = "BooleanArray";

    type ElementRef<'a> = bool;

    fn new_nulls(logical_type: LogicalType, len: usize) -> Result<Self> {
        check_logical_type::<Self>(&logical_type)?;
        Ok(Self {
            logical_type,
            data: Bitmap::from_elem(false, len),
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
    fn get(&self, index: usize) -> Option<bool> {
        self.validity.get(index).then(|| self.data.get(index))
    }

    #[inline]
    fn push(&mut self, element: Option<bool>) -> Result<()> {
        self.data.push(element.unwrap_or_default());
        self.validity.push(element.is_some());
        Ok(())
    }

    #[inline]
    fn set(&mut self, index: usize, element: Option<bool>) -> Result<()> {
        check_index(index, self.len())?;
        self.data.set(index, element.unwrap_or_default());
        self.validity.set(index, element.is_some());
        Ok(())
    }

    fn clear(&mut self) {
        self.data.clear();
        self.validity.clear();
    }
}

impl FromIterator<Option<bool>> for BooleanArray {
    fn from_iter<I: IntoIterator<Item = Option<bool>>>(iter: I) -> Self {
        let mut array = Self {
            logical_type: LogicalType::Boolean,
            data: Bitmap::new(),
            validity: Bitmap::new(),
        };
        iter.into_iter().for_each(|element| {
            array.data.push(element.unwrap_or_default());
            array.validity.push(element.is_some());
        });
        array
    }
}
