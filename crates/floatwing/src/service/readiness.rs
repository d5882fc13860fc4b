/*!
Service readiness signal.

The OS starts the service component asynchronously; whoever builds the
`Service` publishes it here and the host side waits on it. The slot also
carries the host engine so the service channel is installed on it as soon
as both exist, in whichever order they show up.
*/

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::Service;
use crate::platform::UiEngine;
use crate::types::{FloatwingError, FloatwingResult};

/// Process-wide rendezvous between the host side and the running service.
#[derive(Clone)]
pub struct ServiceSlot {
  tx: Arc<watch::Sender<Option<Service>>>,
  host_engine: Arc<RwLock<Option<Arc<dyn UiEngine>>>>,
}

/// Non-owning slot reference held by a published service, so the two don't keep each other alive.
#[derive(Clone)]
pub(crate) struct WeakServiceSlot {
  tx: Weak<watch::Sender<Option<Service>>>,
  host_engine: Weak<RwLock<Option<Arc<dyn UiEngine>>>>,
}

impl WeakServiceSlot {
  pub(crate) fn upgrade(&self) -> Option<ServiceSlot> {
    Some(ServiceSlot {
      tx: self.tx.upgrade()?,
      host_engine: self.host_engine.upgrade()?,
    })
  }
}

impl std::fmt::Debug for ServiceSlot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ServiceSlot")
      .field("ready", &self.tx.borrow().is_some())
      .finish_non_exhaustive()
  }
}

impl Default for ServiceSlot {
  fn default() -> Self {
    Self::new()
  }
}

impl ServiceSlot {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(None);
    Self {
      tx: Arc::new(tx),
      host_engine: Arc::new(RwLock::new(None)),
    }
  }

  /// Publish a running service. The first publish wins; later ones return false.
  pub fn publish(&self, service: Service) -> bool {
    let candidate = service.clone();
    let published = self.tx.send_if_modified(|slot| {
      if slot.is_some() {
        return false;
      }
      *slot = Some(service);
      true
    });
    if !published {
      log::warn!("[service] a service is already published, ignoring");
      return false;
    }

    if let Some(engine) = self.host_engine.read().clone() {
      candidate.install_main_channel(engine);
    }
    log::info!("[service] service is ready");
    true
  }

  /// Withdraw `service` if it is the one published. Returns whether it was.
  pub fn withdraw(&self, service: &Service) -> bool {
    let withdrawn = self.tx.send_if_modified(|slot| match slot {
      Some(current) if current.same_as(service) => {
        *slot = None;
        true
      }
      Some(_) | None => false,
    });
    if withdrawn {
      log::info!("[service] service withdrawn");
    }
    withdrawn
  }

  pub(crate) fn downgrade(&self) -> WeakServiceSlot {
    WeakServiceSlot {
      tx: Arc::downgrade(&self.tx),
      host_engine: Arc::downgrade(&self.host_engine),
    }
  }

  /// The running service, if any.
  pub fn current(&self) -> Option<Service> {
    self.tx.borrow().clone()
  }

  /// Forget the published service (it stopped).
  pub fn clear(&self) {
    if self.tx.send_replace(None).is_some() {
      log::info!("[service] service cleared");
    }
  }

  /// Remember the host engine and install the service channel on it once ready.
  pub fn set_host_engine(&self, engine: Arc<dyn UiEngine>) {
    *self.host_engine.write() = Some(Arc::clone(&engine));
    if let Some(service) = self.current() {
      service.install_main_channel(engine);
    }
  }

  /// Wait until a service is published.
  pub async fn ready(&self, timeout: Duration) -> FloatwingResult<Service> {
    let mut rx = self.tx.subscribe();
    let wait = async {
      rx.wait_for(Option::is_some)
        .await
        .map(|slot| slot.clone())
        .map_err(|_| FloatwingError::ServiceUnavailable)
    };
    match tokio::time::timeout(timeout, wait).await {
      Ok(Ok(Some(service))) => Ok(service),
      Ok(Ok(None)) => Err(FloatwingError::ServiceUnavailable),
      Ok(Err(e)) => Err(e),
      Err(_) => {
        log::error!("[service] service not ready after {timeout:?}");
        Err(FloatwingError::Timeout(timeout))
      }
    }
  }
}
