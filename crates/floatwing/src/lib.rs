/*!
Floatwing - floating overlay windows, each backed by its own UI engine.

```ignore
use floatwing::{Config, Plugin};

// Host side: permission, lazy service start, window creation
let plugin = Plugin::builder(permissions, launcher, slot).build();
plugin.attach_main_engine(host_engine);

let info = plugin
    .create_window("timer".into(), Config { draggable: Some(true), ..Config::default() }, true)
    .await?;

// Windows are addressed by id through the running service
let service = plugin.service().expect("started above");
service.update_window(&"timer".into(), &Config::position(40, 80))?;
service.close_window(&"timer".into(), false); // pause, engine stays cached

// Every event the host engine sees
let mut events = service.subscribe();
while let Ok(envelope) = events.recv().await {
    // window.started, window.drag_end, ...
}
```
*/

mod engine;
mod plugin;
mod service;
mod settings;
mod window;

pub mod platform;
pub mod rpc;

mod types;
pub use types::*;

pub use crate::engine::{LaunchSpec, ResolvedEngine, DEFAULT_ENTRYPOINT};
pub use crate::plugin::{Plugin, PluginBuilder, READY_TIMEOUT};
pub use crate::service::{
  Service, ServiceBuilder, ServiceConfig, ServiceSlot, EVENT_CHANNEL_CAPACITY, SHARE_TIMEOUT,
};
pub use crate::settings::{
  JsonFileStore, MemoryStore, Settings, DEFAULT_PIXEL_RATIO, PIXEL_RATIO_KEY, SYSTEM_CONFIG_KEY,
};
pub use crate::window::Window;
