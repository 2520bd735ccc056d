// Copyright (c) 2024 Mike Tsao

//! Building blocks for other parts of the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::clock::{ClockService, ClockServiceBuilder, TransportState};
}

pub use clock::{ClockService, ClockServiceBuilder, TransportState};

mod clock;
