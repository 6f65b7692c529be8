pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod model;

// Re-export common types
pub use config::Config;
pub use context::AppContext;
pub use error::{PredictionError, Result};
pub use handlers::{configure, PredictionRequest, PredictionResponse};
pub use model::{LogisticModel, ScoringModel, TrainingParams};
