pub mod agreementmodel;
pub mod collabmodel;
pub mod notificationmodel;
pub mod offermodel;
pub mod partymodel;
