pub mod autopilot;
pub mod images;
pub mod runs;
