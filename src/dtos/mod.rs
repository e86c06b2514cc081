pub mod collabdtos;
pub mod common;
pub mod offerdtos;
