//! Simulation toolkit for exercising the link without hardware.
//!
//! Provides an in-memory duplex byte wire implementing the link's serial
//! driver interface, with deterministic seeded impairment (frame loss, byte
//! corruption, read fragmentation, write failures) so integration tests can
//! reproduce a noisy half-duplex radio on a workstation.

pub mod impairment;
pub mod wire;

pub use impairment::Impairment;
pub use wire::SimWire;
