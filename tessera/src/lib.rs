#![warn(clippy::todo)]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    rustdoc::private_intra_doc_links,
    rust_2018_idioms,
    missing_docs,
    clippy::needless_borrow,
    clippy::redundant_clone,
    missing_debug_implementations
)]

//! # Tessera
//!
//! `Tessera` is the batch execution core of a query engine. It provides the data
//! structures that operators build on top of the columnar [`DataBlock`]:
//!
//! - [`ChainedHashTable`]: hash table used by grouping and join. Keys are stored in
//!   fixed capacity segments, the table grows by appending segments, the index of an
//!   entry never changes
//!
//! - [`WindowFrameEngine`]: computes ranking and aggregate window functions over
//!   partitions that span many data blocks, it only buffers the data blocks that are
//!   needed to find the end of the current frame
//!
//! Type-specific logic (hash, comparison, copy, aggregation) is not implemented by
//! the core, it is supplied per query through the [`KeyOps`] and [`FrameOps`] traits.
//!
//! [`DataBlock`]: data_block::block::DataBlock
//! [`ChainedHashTable`]: exec::hash_table::ChainedHashTable
//! [`WindowFrameEngine`]: exec::window::WindowFrameEngine
//! [`KeyOps`]: exec::hash_table::key_ops::KeyOps
//! [`FrameOps`]: exec::window::frame_ops::FrameOps

pub mod common;
pub mod error;
pub mod exec;
