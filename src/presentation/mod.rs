// Presentation layer - Console input and rendering
pub mod console;
