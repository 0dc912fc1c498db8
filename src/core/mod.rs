pub mod charts;
pub mod formatter;
pub mod generator;
pub mod guard;
pub mod prompts;
pub mod session;
pub mod services;
pub mod traits;
