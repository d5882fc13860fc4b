/*!
Point-to-point data exchange.

The only request/response path: the payload is invoked on the receiver's
control channel as `data.share` with `{source, data}`, and the receiver's
answer is relayed back. Replies are bounded by `ServiceConfig::share_timeout`.
*/

use std::time::Duration;

use serde_json::{json, Value};

use super::Service;
use crate::platform::PendingReply;
use crate::types::{FloatwingError, FloatwingResult, WindowId, SHARE_METHOD};

impl Service {
  /// Send `data` from `source` (a window, or the host when `None`) to
  /// `target` (a window, or the host when `None`) and wait for the answer.
  pub async fn share_data(
    &self,
    source: Option<WindowId>,
    target: Option<WindowId>,
    data: Value,
  ) -> FloatwingResult<Value> {
    log::debug!("[service] share data from {source:?} to {target:?}");
    if source == target {
      return Err(FloatwingError::invalid_request(
        "self_share",
        "can't share data with self",
      ));
    }

    let args = json!({ "source": source, "data": data });
    let reply = match &target {
      None => {
        let main = self
          .main_channel()
          .ok_or_else(|| FloatwingError::Channel("host engine channel not installed".into()))?;
        main.invoke(SHARE_METHOD, args)
      }
      Some(target) => {
        let window = self
          .window(target)
          .ok_or_else(|| FloatwingError::WindowNotFound(target.clone()))?;
        window.invoke(SHARE_METHOD, args)
      }
    };

    await_reply(reply, self.inner.config.share_timeout).await
  }
}

pub(crate) async fn await_reply(reply: PendingReply, timeout: Duration) -> FloatwingResult<Value> {
  match tokio::time::timeout(timeout, reply).await {
    Ok(Ok(result)) => result.map_err(FloatwingError::from),
    Ok(Err(_)) => Err(FloatwingError::Channel("receiver dropped the reply".into())),
    Err(_) => {
      log::warn!("[service] no share reply after {timeout:?}");
      Err(FloatwingError::Timeout(timeout))
    }
  }
}
