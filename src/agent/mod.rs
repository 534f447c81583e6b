pub mod advance;
pub mod answer_service;
pub mod budget;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod settings;
pub mod validation;
