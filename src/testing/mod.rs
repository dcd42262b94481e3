//! Testing utilities for crabpreview
//!
//! A scripted stand-in for the platform camera stack, so the session
//! lifecycle can be driven offline without a device.

pub mod simulated;

pub use simulated::{
    synthetic_image, BackendCall, ObservedEvent, RecordingObserver, SimulatedBackend,
    SimulatedControls, SimulatedHost, SimulatedPreview, SimulatedProvider,
};
