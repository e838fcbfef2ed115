// Library root - dashboard schema migration and refresh scheduling
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
