pub mod background_jobs;
pub mod cash_payment;
pub mod commission;
pub mod error;
pub mod invoice_service;
pub mod job_lifecycle;
pub mod job_service;
pub mod notification_service;
pub mod online_payment;
pub mod payment_gateway;
