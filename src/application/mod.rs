// Application layer - Use cases and the collaborators they depend on
pub mod dashboard_service;
pub mod refresh_bus;
pub mod refresh_scheduler;
