//! Shared data model for the deck analysis core and its front ends:
//! quality tiers and profiles, snapshot types, configuration, platform paths.

pub mod config;
pub mod platform;
pub mod quality;
pub mod state;

pub use quality::{QualityProfile, QualityTier};
