pub mod config_manager;
pub mod error;
pub mod logging;
pub mod matrix;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use logging::init_tracing;
pub use matrix::SimilarityMatrix;
pub use types::*;
