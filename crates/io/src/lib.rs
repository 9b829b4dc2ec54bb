// File I/O operations

pub mod csv;
pub mod json;
pub mod table;
pub mod xlsx;

pub use table::{load_rows, load_table, LoadedTable};
