pub mod core;
pub mod export;
pub mod fusion;
pub mod ocr;
pub mod pipeline;
pub mod skeleton;

pub use crate::core::config::FusionConfig;
pub use crate::core::error::{FusionError, Notice, OrphanReason};
pub use crate::core::model::{FusedPage, FusionMapping, GeometricRegion, LinguisticToken};
pub use crate::fusion::index::RegionIndex;
pub use crate::fusion::{CentroidFusionEngine, FusionEngine};
