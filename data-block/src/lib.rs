//! # DataBlock
//!
//! `DataBlock` is the columnar memory format consumed by `tessera`. It supports the
//! small subset of types the execution core needs:
//!
//! - arrays can be created with a fixed length filled with `NULL`, such that
//!   slot-addressed writers (hash table segments, output containers) can write
//!   any index below the length
//!
//! - variable width arrays can carry a byte budget, writes that exceed the budget
//!   fail instead of reallocating
//!
//! Type-specific comparison does not live here, the element level access returns
//! [`ScalarRef`](scalar::ScalarRef) and the callers decide what equality means

pub mod array;
pub mod bitmap;
pub mod block;
mod macros;
pub mod scalar;
pub mod types;

mod private {
    /// Sealed trait protect against downstream implementations
    pub trait Sealed {}
}
