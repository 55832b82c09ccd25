//! Interaction engine for a retro desktop UI: draggable and resizable
//! windows, z-order focus with a breathing-shadow highlight, scatter layout
//! and a pixelated image reveal, all driven over an in-memory document.
//!
//! [`desk::Desk`] is the entry point. The `runner`, `render` and `drivers`
//! modules make up the terminal playground binary.

pub mod cli;
pub mod config;
pub mod constants;
pub mod content;
pub mod debug_log;
pub mod desk;
pub mod dom;
pub mod drivers;
pub mod effects;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod layout;
pub mod observer;
pub mod render;
pub mod runner;
pub mod scheduler;
pub mod theme;
pub mod tracing_sub;
pub mod window;

pub use config::DeskConfig;
pub use desk::{ClickDisposition, Desk};
pub use error::{DeskError, DeskResult};
pub use geometry::{Geometry, Point};
