pub mod file_report_cache;
