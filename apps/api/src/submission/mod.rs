pub mod adapters;
pub mod history;
pub mod orchestrator;
