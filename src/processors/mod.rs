pub mod merger;
pub mod normalizer;
pub mod point_extractor;
pub mod processed_index;

pub use merger::SeriesMerger;
pub use normalizer::MonthlyNormalizer;
pub use point_extractor::{Extraction, PointExtractor, PointTarget, TimeSource};
pub use processed_index::ProcessedIndex;
