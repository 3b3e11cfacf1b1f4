pub mod services;

pub use services::http_store::HttpSchedulingStore;
