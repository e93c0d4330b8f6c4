//! File I/O for columnar artifacts.

pub mod parquet;
