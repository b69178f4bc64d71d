//! Audio separation service
//!
//! Accepts an audio upload and returns an isolated vocal track and an
//! isolated instrumental track. Separation itself is delegated to an external
//! collaborator: a local tool run as a subprocess, or the Replicate
//! prediction API with Cloudinary hosting the results.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
