pub mod config;
pub mod error;
pub mod model;
pub mod source;

// Stream plumbing
pub mod relay;
pub mod supervisor;

// Derived state and view models
pub mod lifecycle;
pub mod selection;
pub mod viewport;
