pub mod records;
pub mod remote;
pub mod report;
