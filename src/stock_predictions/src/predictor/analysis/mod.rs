pub mod analysis;
pub mod api;
pub mod correlation;

pub use self::analysis::FeatureBuilder;
pub use api::{FeatureError, FeatureSettings, LOG_RETURNS_COLUMN};
pub use correlation::CorrelationReport;
