/*!
Headless floatwing simulator.

Reads one JSON request per line on stdin and answers on stdout:

```text
-> {"id": 1, "channel": "plugin", "method": "plugin.create_window", "args": {"id": "w1", "config": {}, "start": true}}
<- {"event": {"name": "window.created", "id": "w1", "data": true}, "to": "w1"}
<- {"id": 1, "result": {"id": "w1", "config": {...}, "pixelRatio": 2.0, "system": {}}}
```

`channel` is `plugin` (host-side permission and service calls) or `service`
(window calls). `from` names the calling window; omit it to call as the host.
Every envelope an engine receives is printed as an `event` line, addressed
to `host` or the receiving window's id.

Logs go to stderr, filtered by `RUST_LOG`.
*/

use std::sync::Arc;

use floatwing::platform::headless::{window_of, HeadlessPlatform, MessageListener};
use floatwing::rpc::{self, Caller};
use floatwing::{Envelope, ErrorPayload, Plugin, ServiceConfig, WindowId};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Channel {
  Plugin,
  Service,
}

#[derive(Debug, Deserialize)]
struct Request {
  #[serde(default)]
  id: Value,
  channel: Channel,
  #[serde(default)]
  from: Option<WindowId>,
  method: String,
  #[serde(default)]
  args: Value,
}

fn print_line(value: &Value) {
  println!("{value}");
}

fn event_printer() -> MessageListener {
  Arc::new(|label: &str, envelope: &Envelope| {
    let to = window_of(label).map_or_else(|| "host".to_string(), |id| id.to_string());
    print_line(&json!({ "event": envelope, "to": to }));
  })
}

async fn handle(plugin: &Plugin, request: Request) -> Value {
  match request.channel {
    Channel::Plugin => rpc::plugin_dispatch_json(plugin, &request.method, &request.args).await,
    Channel::Service => match plugin.ensure_service().await {
      Ok(service) => {
        let caller = request.from.map_or(Caller::Host, Caller::Window);
        rpc::dispatch_json(&service, &caller, &request.method, &request.args).await
      }
      Err(e) => json!({ "error": ErrorPayload::from(&e) }),
    },
  }
}

/// Attach the request id to a `{"result"}` / `{"error"}` reply.
fn with_id(id: Value, reply: Value) -> Value {
  match reply {
    Value::Object(mut map) => {
      map.insert("id".to_string(), id);
      Value::Object(map)
    }
    other @ (Value::Null
    | Value::Bool(_)
    | Value::Number(_)
    | Value::String(_)
    | Value::Array(_)) => json!({ "id": id, "result": other }),
  }
}

#[tokio::main]
async fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    .target(env_logger::Target::Stderr)
    .init();

  let platform = HeadlessPlatform::with_listener(ServiceConfig::default(), event_printer());
  platform.permissions.set_granted(true);

  let plugin = platform.plugin();
  plugin.attach_main_engine(platform.host_engine());
  log::info!("[sim] ready, reading requests from stdin");

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    let line = match lines.next_line().await {
      Ok(Some(line)) => line,
      Ok(None) => break,
      Err(e) => {
        log::error!("[sim] failed to read stdin: {e}");
        break;
      }
    };
    if line.trim().is_empty() {
      continue;
    }

    let reply = match serde_json::from_str::<Request>(&line) {
      Ok(request) => {
        let id = request.id.clone();
        with_id(id, handle(&plugin, request).await)
      }
      Err(e) => {
        log::warn!("[sim] malformed request: {e}");
        json!({
          "id": Value::Null,
          "error": { "code": "invalid_request", "message": e.to_string() },
        })
      }
    };
    print_line(&reply);
  }

  if let Some(service) = plugin.service() {
    service.shutdown();
  }
  log::info!("[sim] stdin closed, shutting down");
}
