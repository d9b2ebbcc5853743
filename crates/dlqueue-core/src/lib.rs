pub mod api;
pub mod config;
pub mod job_store;
pub mod logging;
pub mod pool;
pub mod reconcile;
pub mod scheduler;
pub mod transfer;
pub mod url_model;
