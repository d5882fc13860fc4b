/*!
Platform layer.

- `traits.rs` - the contract every platform implements
- `headless.rs` - in-memory implementation for tests and the simulator
*/

pub mod headless;
mod traits;

pub use traits::{
  EngineGroup, PendingReply, Permissions, ServiceHost, ServiceLauncher, SettingsStore, Surface,
  SurfaceFactory, UiEngine, WindowManager,
};
