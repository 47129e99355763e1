pub mod interval;
pub mod keyed_table;
pub mod row_key;
pub mod value;

// re-export for cleaner imports
pub use self::interval::TargetInterval;
pub use self::keyed_table::{FieldSpec, KeyedTable, SampleColumn, Schema};
pub use self::row_key::{RowKey, RowKeyKind};
pub use self::value::{ColumnData, ElementType, NULL_TOKEN, Value};
