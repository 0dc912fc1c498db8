pub mod database;
pub mod entities;
pub mod llm;
pub mod repositories;
pub mod setup;
pub mod traits;
