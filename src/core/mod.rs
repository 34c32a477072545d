pub mod autopilot;
pub mod config;
pub mod content;
pub mod images;
pub mod journal;
pub mod lifecycle;
pub mod llm;
pub mod publish;
pub mod terminal;
