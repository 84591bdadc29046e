mod api_key_extractor;
mod tracing_layer;
mod metrics_layer;

pub use api_key_extractor::*;
pub use tracing_layer::*;
pub use metrics_layer::*;
