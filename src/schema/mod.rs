pub mod column_mapper;

pub use column_mapper::{normalize_column_name, ColumnMapping, FieldPatterns, LogicalField};
