//! Execution module contains the structures operators use to process the
//! [`DataBlock`](data_block::block::DataBlock)s

pub mod hash_table;
pub mod window;
