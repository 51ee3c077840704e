pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::{nearest_index, normalize_longitude};
pub use filename::{embedded_date, file_name_from_url};
pub use logging::init_logging;
pub use progress::ProgressReporter;
