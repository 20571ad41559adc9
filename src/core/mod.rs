pub mod extract;
pub mod matcher;
pub mod media;
pub mod normalize;
pub mod planner;
pub mod sync;

pub use crate::domain::model::{DbSnapshot, ParsedExport};
pub use crate::domain::ports::{ConfigProvider, ContentStore, Storage, SyncSettings, Thresholds};
pub use crate::utils::error::Result;
