//! Data model: dynamic values and their tabular projection

mod table;
mod value;

pub use table::{IndexedTable, Row, Table, TRANSPOSE_LABEL};
pub use value::{DynamicValue, Object};
