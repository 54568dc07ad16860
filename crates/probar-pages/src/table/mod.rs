//! Data tables rendered by the application.
//!
//! A table is located by tag and test attribute, its header is parsed once into a
//! [`HeaderIndex`], and rows, columns and cells are then addressed by 1-based
//! positions through xpaths relative to the table root.

pub mod markup;
mod model;
pub mod parsers;

pub use model::{BoundColumn, Column, ColumnSearch, NestedTables, Table, TableSpec};
pub use parsers::{parse_table_cell, parse_table_row, parse_table_thead, HeaderIndex, TEXT_KEY};
