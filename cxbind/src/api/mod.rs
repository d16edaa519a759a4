pub mod collect;
pub mod generator;
pub mod native;
pub mod report;
pub mod source;
