pub mod core;
pub mod practices;
pub mod reports;
pub mod teachers;
