/*! Core types for floatwing.

Regenerate TypeScript types: `cargo test -p floatwing export_bindings`
*/

#![allow(missing_docs)]

mod config;
mod error;
mod event;
mod geometry;
mod ids;
pub mod layout;
mod pointer;
mod window;

pub use config::Config;
pub use error::{ErrorPayload, FloatwingError, FloatwingResult};
pub use event::{Envelope, WindowEvent, DATA_PREFIX, SHARE_METHOD, WINDOW_PREFIX};
pub use geometry::Point;
pub use ids::{EngineKey, WindowId, ENGINE_KEY_PREFIX};
pub use layout::{LayoutParams, PlatformPolicy, WindowFlags};
pub use pointer::{PointerAction, PointerEvent};
pub use window::{InitStatus, Lifecycle, NotificationOptions, WindowInfo};
