pub mod audit;
pub mod report;
pub mod status;
