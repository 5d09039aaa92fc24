//! Core data types shared by strategies, the engine, and metrics

pub mod fire;
pub mod grid;
pub mod rng;
pub mod sensor;

pub use fire::{FireState, FireStatus};
pub use grid::{disk_offsets, Grid, GridShape};
pub use rng::SimRng;
pub use sensor::{SensorPlacement, SensorPosition};
