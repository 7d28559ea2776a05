pub mod columns;
pub mod table;

pub use columns::{CanonicalField, ColumnMap, ResolvedColumns};
pub use table::RawTable;
