pub mod analysis;
pub mod chart;
pub mod cli;
pub mod core;
pub mod google;
