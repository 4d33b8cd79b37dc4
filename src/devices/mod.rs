// MIT License - Copyright (c) 2026 Peter Wright
// Panel entities

pub mod area;
pub mod zone;

pub use area::{Area, AreaLabel, AreaStates, AreaStatus, ExitModifier};
pub use zone::{Zone, ZoneStates, ZoneStatus};
