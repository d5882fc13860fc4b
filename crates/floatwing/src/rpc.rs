/*!
RPC request/response types and dispatch.

Requests arrive as `{method, args}` on one of two channels: the plugin
channel (host only) and the service channel (host and every window engine).
Responses are `{"result": ...}` or `{"error": {code, message}}`. Unknown
window ids are not errors and answer `{"result": null}`.
*/

#![allow(missing_docs)]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use ts_rs::TS;

use crate::plugin::Plugin;
use crate::service::Service;
use crate::types::{
  Config, ErrorPayload, FloatwingError, FloatwingResult, InitStatus, NotificationOptions,
  WindowId, WindowInfo,
};

/// Who sent a service request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
  /// The host application's engine.
  Host,
  /// A window's own engine.
  Window(WindowId),
}

impl Caller {
  pub const fn window_id(&self) -> Option<&WindowId> {
    match self {
      Self::Host => None,
      Self::Window(id) => Some(id),
    }
  }

  /// Window a request is about: the explicit id, else the caller itself.
  pub fn target(&self, id: Option<WindowId>) -> WindowId {
    id.or_else(|| self.window_id().cloned()).unwrap_or_default()
  }
}

/// Request on the service channel.
#[derive(Debug, Deserialize, TS)]
#[serde(tag = "method", content = "args")]
#[ts(export)]
pub enum ServiceRequest {
  /// Create a top-level window.
  #[serde(rename = "service.create_window")]
  CreateWindow {
    #[serde(default)]
    id: Option<WindowId>,
    config: Config,
    #[serde(default)]
    start: bool,
  },
  /// Create a window parented to the calling window.
  #[serde(rename = "window.create_child")]
  CreateChild {
    #[serde(default)]
    id: Option<WindowId>,
    config: Config,
    #[serde(default)]
    start: bool,
  },
  #[serde(rename = "window.start")]
  Start {
    #[serde(default)]
    id: Option<WindowId>,
  },
  #[serde(rename = "window.close")]
  Close {
    #[serde(default)]
    id: Option<WindowId>,
    #[serde(default)]
    force: bool,
  },
  #[serde(rename = "window.destroy")]
  Destroy {
    #[serde(default)]
    id: Option<WindowId>,
  },
  #[serde(rename = "window.show")]
  Show {
    #[serde(default)]
    id: Option<WindowId>,
    #[serde(default = "default_visible")]
    visible: bool,
  },
  #[serde(rename = "window.update")]
  Update {
    #[serde(default)]
    id: Option<WindowId>,
    config: Config,
  },
  /// A window engine asks for its own representation once it is ready.
  #[serde(rename = "window.sync")]
  Sync {},
  /// Request/response exchange with another window or the host.
  #[serde(rename = "data.share")]
  Share {
    #[serde(default)]
    target: Option<WindowId>,
    #[serde(default)]
    #[ts(type = "unknown")]
    data: Value,
  },
  #[serde(rename = "service.stop_service")]
  StopService {},
  #[serde(rename = "service.promote")]
  Promote(NotificationOptions),
  #[serde(rename = "service.demote")]
  Demote {},
}

const fn default_visible() -> bool {
  true
}

/// Request on the plugin channel.
#[derive(Debug, Deserialize, TS)]
#[serde(tag = "method", content = "args")]
#[ts(export)]
pub enum PluginRequest {
  #[serde(rename = "plugin.initialize")]
  Initialize {
    #[serde(default, rename = "pixelRatio", alias = "pixelRadio")]
    pixel_ratio: Option<f64>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown> | null")]
    system: Option<Map<String, Value>>,
  },
  #[serde(rename = "plugin.has_permission")]
  HasPermission {},
  #[serde(rename = "plugin.open_permission_setting")]
  OpenPermissionSetting {},
  #[serde(rename = "plugin.grant_permission")]
  GrantPermission {},
  #[serde(rename = "plugin.create_window")]
  CreateWindow {
    #[serde(default)]
    id: Option<WindowId>,
    config: Config,
    #[serde(default)]
    start: bool,
  },
  #[serde(rename = "plugin.is_service_running")]
  IsServiceRunning {},
  #[serde(rename = "plugin.start_service")]
  StartService {},
}

/// RPC response.
#[derive(Debug, Serialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum RpcResponse {
  /// Window representation.
  Window(Box<WindowInfo>),
  /// Bootstrap status.
  Status(Box<InitStatus>),
  Flag(bool),
  /// Reply relayed from the receiving side of a share.
  Data(#[ts(type = "unknown")] Value),
  /// No such window, or nothing to return.
  Null,
}

impl From<Option<WindowInfo>> for RpcResponse {
  fn from(info: Option<WindowInfo>) -> Self {
    info.map_or(Self::Null, |info| Self::Window(Box::new(info)))
  }
}

impl From<Option<bool>> for RpcResponse {
  fn from(flag: Option<bool>) -> Self {
    flag.map_or(Self::Null, Self::Flag)
  }
}

/// Parse `{method, args}`; null args count as `{}`.
fn parse<T: DeserializeOwned>(method: &str, args: &Value) -> FloatwingResult<T> {
  let args = if args.is_null() { json!({}) } else { args.clone() };
  serde_json::from_value(json!({ "method": method, "args": args }))
    .map_err(|e| FloatwingError::invalid_request("invalid_request", e.to_string()))
}

fn respond(method: &str, result: FloatwingResult<RpcResponse>) -> Value {
  match result {
    Ok(response) => json!({ "result": response }),
    Err(e) => {
      log::warn!("[rpc] {method} failed: {e}");
      json!({ "error": ErrorPayload::from(&e) })
    }
  }
}

pub async fn dispatch_json(service: &Service, caller: &Caller, method: &str, args: &Value) -> Value {
  match parse::<ServiceRequest>(method, args) {
    Ok(request) => respond(method, dispatch(service, caller, request).await),
    Err(e) => {
      log::warn!("[rpc] Invalid request for {method}: {e}");
      json!({ "error": ErrorPayload::from(&e) })
    }
  }
}

pub async fn dispatch(
  service: &Service,
  caller: &Caller,
  request: ServiceRequest,
) -> FloatwingResult<RpcResponse> {
  match request {
    ServiceRequest::CreateWindow { id, config, start } => {
      let id = id.unwrap_or_default();
      log::debug!("[rpc] create window {id} from {caller:?}");
      Ok(service.create_window(id, config, start)?.into())
    }

    ServiceRequest::CreateChild { id, config, start } => {
      let Caller::Window(parent) = caller else {
        return Err(FloatwingError::invalid_request(
          "no_parent",
          "window.create_child must be called from a window",
        ));
      };
      let id = id.unwrap_or_default();
      Ok(service.create_child(parent, id, config, start)?.into())
    }

    ServiceRequest::Start { id } => Ok(service.start_window(&caller.target(id))?.into()),

    ServiceRequest::Close { id, force } => Ok(service.close_window(&caller.target(id), force).into()),

    ServiceRequest::Destroy { id } => Ok(service.close_window(&caller.target(id), true).into()),

    ServiceRequest::Show { id, visible } => {
      Ok(service.show_window(&caller.target(id), visible)?.into())
    }

    ServiceRequest::Update { id, config } => {
      Ok(service.update_window(&caller.target(id), &config)?.into())
    }

    ServiceRequest::Sync {} => match caller {
      Caller::Window(id) => Ok(service.window(id).map(|w| w.info()).into()),
      Caller::Host => {
        log::debug!("[rpc] window.sync from the host has nothing to sync");
        Ok(RpcResponse::Null)
      }
    },

    ServiceRequest::Share { target, data } => {
      let source = caller.window_id().cloned();
      let reply = service.share_data(source, target, data).await?;
      Ok(RpcResponse::Data(reply))
    }

    ServiceRequest::StopService {} => Ok(RpcResponse::Flag(service.stop())),

    ServiceRequest::Promote(options) => Ok(RpcResponse::Flag(service.promote(&options))),

    ServiceRequest::Demote {} => Ok(RpcResponse::Flag(service.demote())),
  }
}

pub async fn plugin_dispatch_json(plugin: &Plugin, method: &str, args: &Value) -> Value {
  match parse::<PluginRequest>(method, args) {
    Ok(request) => respond(method, plugin_dispatch(plugin, request).await),
    Err(e) => {
      log::warn!("[rpc] Invalid request for {method}: {e}");
      json!({ "error": ErrorPayload::from(&e) })
    }
  }
}

pub async fn plugin_dispatch(plugin: &Plugin, request: PluginRequest) -> FloatwingResult<RpcResponse> {
  match request {
    PluginRequest::Initialize {
      pixel_ratio,
      system,
    } => {
      let status = plugin.initialize(pixel_ratio, system)?;
      Ok(RpcResponse::Status(Box::new(status)))
    }

    PluginRequest::HasPermission {} => Ok(RpcResponse::Flag(plugin.has_permission())),

    PluginRequest::OpenPermissionSetting {} => {
      Ok(RpcResponse::Flag(plugin.open_permission_setting()))
    }

    PluginRequest::GrantPermission {} => Ok(RpcResponse::Flag(plugin.grant_permission().await)),

    PluginRequest::CreateWindow { id, config, start } => {
      let id = id.unwrap_or_default();
      Ok(plugin.create_window(id, config, start).await?.into())
    }

    PluginRequest::IsServiceRunning {} => Ok(RpcResponse::Flag(plugin.is_service_running())),

    PluginRequest::StartService {} => Ok(RpcResponse::Flag(plugin.start_service().await)),
  }
}
