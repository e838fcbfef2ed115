// Presentation layer - Console output of the dashboard binary
pub mod console;
