// Domain layer - Dashboard document model and pure schema transforms
pub mod dashboard;
pub mod interval;
pub mod schema;
