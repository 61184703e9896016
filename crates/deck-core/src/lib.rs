pub mod backend;
pub mod controller;
pub mod error;
pub mod meter;
pub mod perf;
pub mod scope;
pub mod signal;
pub mod spectrum;
pub mod timer;

pub use backend::{AudioBackend, NullBackend, TrackRef};
pub use controller::{EngineSettings, FrameRequest, FrameToken, RenderLoop};
pub use error::BackendError;
