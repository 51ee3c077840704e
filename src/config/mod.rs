pub mod acquisition;
pub mod unify;

pub use acquisition::{default_collections, AcquisitionConfig, CollectionConfig};
pub use unify::{Preset, UnifyPlan};
