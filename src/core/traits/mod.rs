pub mod local_store;
pub mod remote_api;
pub mod report_cache;
