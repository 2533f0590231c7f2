pub mod arrival;
pub mod lifecycle;
pub mod stats;
