//! Array of String.
//!
//! Each element is a view (offset, length) into a single byte buffer. Overwriting
//! a slot appends the new bytes and re-points the view, the bytes of the old value
//! are not reclaimed until [`Array::clear`]. Writers that own a slot range write
//! each slot once, so the waste is bounded in practice.
//!
//! The byte buffer can be given a budget with [`StringArray::set_byte_limit`], a
//! write that would exceed it fails with [`ArrayError::ByteCapacityExceeded`]
//! instead of growing the buffer.
//!
//! [`ArrayError::ByteCapacityExceeded`]: super::ArrayError::ByteCapacityExceeded

use super::{Array, ByteCapacityExceededSnafu, Result, check_index, check_logical_type};
use crate::bitmap::Bitmap;
use crate::private::Sealed;
use crate::types::{LogicalType, PhysicalType};
use snafu::ensure;
use std::fmt::Debug;

/// Maximal number of bytes a [`StringArray`] can hold, views address the buffer
/// with `u32`
pub const MAX_STRING_BYTES: usize = u32::MAX as usize;

/// View of the string in the bytes buffer
#[derive(Debug, Clone, Copy, Default)]
struct StringView {
    offset: u32,
    len: u32,
}

impl StringView {
    /// View of `len` bytes appended after `used` bytes, fails if the end of the
    /// view exceeds `limit` or [`MAX_STRING_BYTES`]
    fn try_new(used: usize, len: usize, limit: Option<usize>) -> Result<Self> {
        let limit = limit.map_or(MAX_STRING_BYTES, |limit| limit.min(MAX_STRING_BYTES));
        ensure!(
            used.checked_add(len).is_some_and(|end| end <= limit),
            ByteCapacityExceededSnafu {
                required: len,
                used,
                limit,
            }
        );
        Ok(Self {
            offset: used as u32,
            len: len as u32,
        })
    }
}

/// [`Array`] of string
pub struct StringArray {
    logical_type: LogicalType,
    bytes: Vec<u8>,
    views: Vec<StringView>,
    validity: Bitmap,
    byte_limit: Option<usize>,
}

impl StringArray {
    /// Limit the number of bytes the array can hold, `None` means unlimited
    #[inline]
    pub fn set_byte_limit(&mut self, limit: Option<usize>) {
        self.byte_limit = limit;
    }

    /// Number of bytes used by the array
    #[inline]
    pub fn bytes_len(&self) -> usize {
        self.bytes.len()
    }

    fn append_bytes(&mut self, value: &str) -> Result<StringView> {
        let view = StringView::try_new(self.bytes.len(), value.len(), self.byte_limit)?;
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(view)
    }
}

impl Sealed for StringArray {}

impl Debug for StringArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringArray {{ len: {}, data: ", self.len())?;
        f.debug_list().entries(self.iter()).finish()?;
        write!(f, " }}")
    }
}

impl Array for StringArray {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::String;

    const NAME: &'static str = "StringArray";

    type ElementRef<'a> = &'a str;

    fn new_nulls(logical_type: LogicalType, len: usize) -> Result<Self> {
        check_logical_type::<Self>(&logical_type)?;
        Ok(Self {
            logical_type,
            bytes: Vec::new(),
            views: vec![StringView::default(); len],
            validity: Bitmap::from_elem(false, len),
            byte_limit: None,
        })
    }

    #[inline]
    fn len(&self) -> usize {
        self.views.len()
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
    fn get(&self, index: usize) -> Option<&str> {
        if !self.validity.get(index) {
            return None;
        }
        let view = self.views[index];
        let start = view.offset as usize;
        let bytes = &self.bytes[start..start + view.len as usize];
        // SAFETY: bytes are copied from `&str` in `append_bytes`, views always cover
        // a whole string
        Some(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    fn push(&mut self, element: Option<&str>) -> Result<()> {
        let view = match element {
            Some(value) => self.append_bytes(value)?,
            None => StringView::default(),
        };
        self.views.push(view);
        self.validity.push(element.is_some());
        Ok(())
    }

    fn set(&mut self, index: usize, element: Option<&str>) -> Result<()> {
        check_index(index, self.len())?;
        let view = match element {
            Some(value) => self.append_bytes(value)?,
            None => StringView::default(),
        };
        self.views[index] = view;
        self.validity.set(index, element.is_some());
        Ok(())
    }

    fn clear(&mut self) {
        self.bytes.clear();
        self.views.clear();
        self.validity.clear();
    }
}

/// # Panics
///
/// Panics if the strings take more than [`MAX_STRING_BYTES`] bytes
impl<'a> FromIterator<Option<&'a str>> for StringArray {
    fn from_iter<I: IntoIterator<Item = Option<&'a str>>>(iter: I) -> Self {
        let mut array = Self {
            logical_type: LogicalType::VarChar,
            bytes: Vec::new(),
            views: Vec::new(),
            validity: Bitmap::new(),
            byte_limit: None,
        };
        iter.into_iter().for_each(|element| {
            let view = match element {
                Some(value) => array
                    .append_bytes(value)
                    .unwrap_or_else(|err| panic!("Failed to collect StringArray: {err}")),
                None => StringView::default(),
            };
            array.views.push(view);
            array.validity.push(element.is_some());
        });
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_view_exceeds_u32_offsets() {
        let view = StringView::try_new(MAX_STRING_BYTES - 4, 4, None).unwrap();
        assert_eq!(view.offset, u32::MAX - 4);
        assert_eq!(view.len, 4);

        let err = StringView::try_new(MAX_STRING_BYTES - 4, 5, None).unwrap_err();
        expect!["Writing `5` bytes exceeds the byte budget of the array. Used: `4294967291`, budget: `4294967295`"]
            .assert_eq(&err.to_string());

        // Budget larger than the view can address is capped
        assert!(StringView::try_new(MAX_STRING_BYTES, 1, Some(usize::MAX)).is_err());
        assert!(StringView::try_new(usize::MAX, 1, Some(usize::MAX)).is_err());
    }

    #[test]
    fn test_from_iter_and_get() {
        let array = StringArray::from_iter([Some("curvature"), None, Some("")]);
        assert_eq!(array.len(), 3);
        assert_eq!(array.get(0), Some("curvature"));
        assert_eq!(array.get(1), None);
        assert_eq!(array.get(2), Some(""));
    }

    #[test]
    fn test_byte_limit() {
        let mut array = StringArray::new_nulls(LogicalType::VarChar, 3).unwrap();
        array.set_byte_limit(Some(8));
        array.set(0, Some("abcde")).unwrap();
        let err = array.set(1, Some("fghij")).unwrap_err();
        expect!["Writing `5` bytes exceeds the byte budget of the array. Used: `5`, budget: `8`"]
            .assert_eq(&err.to_string());
        // Failed write leaves the slot untouched
        assert_eq!(array.get(1), None);
        array.set(1, Some("fgh")).unwrap();
        assert_eq!(array.get(1), Some("fgh"));
        assert_eq!(array.bytes_len(), 8);
    }
}
