//! Strata window stacking engine.
//!
//! This library decides the front-to-back order of all windows managed by a
//! compositor, grouping them into layers and keeping transients stacked with
//! the windows they belong to.

pub mod config;
pub mod focus;
pub mod layer;
pub mod output;
pub mod space;
pub mod stacking;
pub mod window;

pub use crate::config::Config;
pub use crate::layer::Layer;
pub use crate::space::Space;
pub use crate::stacking::{StackingOrder, UpdateBlocker};
pub use crate::window::{Window, WindowAttributes, WindowId, WindowKind};
