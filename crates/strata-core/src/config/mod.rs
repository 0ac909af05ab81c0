mod projection;

pub use projection::{ProjectionConfig, ReadModelProjectionConfig};
