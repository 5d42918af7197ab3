//! Macros used in the data-block

/// Macros for all of the variants in the array
///
/// Tuple: {enum variant name, array type}
macro_rules! for_all_variants {
    ($macro:ident) => {
        $macro! {
            {Boolean, BooleanArray},
            {Int32, Int32Array},
            {Int64, Int64Array},
            {Float64, Float64Array},
            {String, StringArray}
        }
    };
}

pub(crate) use for_all_variants;

/// Call macro for all primitive types.
///
/// Tuple: {enum variant name, element type, default logical type variant}
macro_rules! for_all_primitive_types {
    ($macro:ident) => {
        $macro! {
            {Int32, i32, Integer},
            {Int64, i64, BigInt},
            {Float64, f64, Double}
        }
    };
}

pub(crate) use for_all_primitive_types;
