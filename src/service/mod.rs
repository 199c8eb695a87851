//! Background service lifecycle and lazy binding.
//!
//! `ServiceHost` owns the single control object of a background service and
//! exposes it only as a `ServiceHandle` (a weak reference or `Unstarted`).
//! `LazyBinding` is the only way callers reach the object: it dereferences the
//! handle, and when the service is not running issues one start request and
//! retries exactly once before reporting `ServiceError::Unavailable`.

pub mod enhancer;

pub use enhancer::{AudioEnhancer, DiracControl};

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::error::ServiceError;

/// Produces the control object when the service starts; `None` if it failed to come up
pub type EnhancerFactory = Box<dyn Fn() -> Option<Arc<dyn AudioEnhancer>> + Send + Sync>;

/// What an observer sees of the service
#[derive(Clone)]
pub enum ServiceHandle {
    Unstarted,
    Available(Weak<dyn AudioEnhancer>),
}

/// Process-wide owner of the enhancer control object
pub struct ServiceHost {
    name: String,
    slot: RwLock<Option<Arc<dyn AudioEnhancer>>>,
    factory: EnhancerFactory,
    start_requests: AtomicUsize,
    accesses: AtomicUsize,
}

/// Hosts the bundled in-process `DiracControl`. Its state lives only as long
/// as the process; a device audio engine plugs in through `ServiceHost::new`
/// with its own factory.
static GLOBAL_HOST: Lazy<Arc<ServiceHost>> = Lazy::new(|| {
    Arc::new(ServiceHost::new(
        "DiracService",
        Box::new(|| Some(Arc::new(DiracControl::new()) as Arc<dyn AudioEnhancer>)),
    ))
});

impl ServiceHost {
    pub fn new(name: &str, factory: EnhancerFactory) -> Self {
        ServiceHost {
            name: name.to_string(),
            slot: RwLock::new(None),
            factory,
            start_requests: AtomicUsize::new(0),
            accesses: AtomicUsize::new(0),
        }
    }

    /// The process-wide enhancer host
    pub fn global() -> Arc<ServiceHost> {
        Arc::clone(&GLOBAL_HOST)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the service. Starting a running instance is a no-op.
    pub fn start(&self) {
        self.start_requests.fetch_add(1, Ordering::SeqCst);
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return;
        }
        match (self.factory)() {
            Some(control) => {
                log::info!("[ServiceHost] {} started", self.name);
                *slot = Some(control);
            }
            None => log::warn!("[ServiceHost] {} did not come up", self.name),
        }
    }

    /// Drop the control object; outstanding weak handles stop resolving
    pub fn stop(&self) {
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.take().is_some() {
            log::info!("[ServiceHost] {} stopped", self.name);
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        let slot = match self.slot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.as_ref() {
            Some(control) => ServiceHandle::Available(Arc::downgrade(control)),
            None => ServiceHandle::Unstarted,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.slot.read().map(|s| s.is_some()), Ok(true))
    }

    /// Start requests received so far
    pub fn start_requests(&self) -> usize {
        self.start_requests.load(Ordering::SeqCst)
    }

    /// Handle dereferences so far
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }
}

/// Retry bound after the first failed dereference
const START_RETRIES: usize = 1;

/// Resolves the control object on demand, starting the service at most once per call
#[derive(Clone)]
pub struct LazyBinding {
    host: Arc<ServiceHost>,
}

impl LazyBinding {
    pub fn new(host: Arc<ServiceHost>) -> Self {
        LazyBinding { host }
    }

    pub fn host(&self) -> &Arc<ServiceHost> {
        &self.host
    }

    /// Resolve the control object, starting the service if needed
    ///
    /// The returned `Arc` must not be held across interactions.
    pub fn get_or_start(&self) -> Result<Arc<dyn AudioEnhancer>, ServiceError> {
        let mut retries = 0;
        loop {
            if let ServiceHandle::Available(weak) = self.host.handle() {
                if let Some(control) = weak.upgrade() {
                    return Ok(control);
                }
            }
            if retries == START_RETRIES {
                log::warn!(
                    "[LazyBinding] {} still unavailable after start request",
                    self.host.name()
                );
                return Err(ServiceError::Unavailable(self.host.name().to_string()));
            }
            log::debug!("[LazyBinding] {} not running, requesting start", self.host.name());
            self.host.start();
            retries += 1;
        }
    }

    /// Run one operation against the control object
    pub fn with<T>(
        &self,
        f: impl FnOnce(&dyn AudioEnhancer) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let control = self.get_or_start()?;
        f(control.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_starts() -> Arc<ServiceHost> {
        Arc::new(ServiceHost::new("Dead", Box::new(|| None)))
    }

    fn dirac_host() -> Arc<ServiceHost> {
        Arc::new(ServiceHost::new(
            "Dirac",
            Box::new(|| Some(Arc::new(DiracControl::new()) as Arc<dyn AudioEnhancer>)),
        ))
    }

    #[test]
    fn test_start_is_idempotent() {
        let host = dirac_host();
        host.start();
        let first = LazyBinding::new(host.clone()).get_or_start().unwrap();
        first.set_enabled(true);
        host.start();
        let second = LazyBinding::new(host.clone()).get_or_start().unwrap();
        assert!(second.is_enabled());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unstarted_service_started_once() {
        let host = dirac_host();
        let binding = LazyBinding::new(host.clone());
        assert!(binding.get_or_start().is_ok());
        assert_eq!(host.start_requests(), 1);
        assert_eq!(host.accesses(), 2);

        // Running now: no further start requests
        assert!(binding.get_or_start().is_ok());
        assert_eq!(host.start_requests(), 1);
    }

    #[test]
    fn test_unavailable_after_single_retry() {
        let host = never_starts();
        let binding = LazyBinding::new(host.clone());
        assert_eq!(
            binding.get_or_start().err(),
            Some(ServiceError::Unavailable("Dead".to_string()))
        );
        assert_eq!(host.start_requests(), 1);
        assert_eq!(host.accesses(), 2);
    }

    #[test]
    fn test_stopped_service_handle_is_unstarted() {
        let host = dirac_host();
        host.start();
        let handle = host.handle();
        host.stop();
        match handle {
            ServiceHandle::Available(weak) => assert!(weak.upgrade().is_none()),
            ServiceHandle::Unstarted => panic!("handle taken while running"),
        }
        assert!(matches!(host.handle(), ServiceHandle::Unstarted));
    }
}
