pub mod dataset;
pub mod model;
pub mod model_cache;
pub mod scenario;
pub mod state;
