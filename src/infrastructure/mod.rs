// Infrastructure layer - External dependencies and adapters
pub mod broadcast_bus;
pub mod config;
pub mod document_source;
