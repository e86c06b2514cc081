pub mod affiliate;
pub mod token;
