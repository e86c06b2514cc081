pub mod agreements;
pub mod collaborations;
pub mod notifications;
pub mod offers;
