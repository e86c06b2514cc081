pub mod agreementdb;
pub mod collabdb;
pub mod db;
pub mod notificationdb;
pub mod offerdb;
pub mod partydb;
