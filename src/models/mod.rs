pub mod month;
pub mod observation;
pub mod series;
pub mod source;
pub mod table;

pub use month::YearMonth;
pub use observation::{GranuleRef, Observation};
pub use series::{MonthlySeries, RawObservation};
pub use source::{ColumnRef, SourceSpec};
pub use table::UnifiedTable;
