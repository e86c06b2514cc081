pub mod agreement_service;
pub mod background_jobs;
pub mod collaboration_service;
pub mod error;
pub mod notification_service;
pub mod offer_service;
pub mod payment_gateway;
pub mod traffic_service;
