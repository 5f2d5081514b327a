//! The context handle (spec §4.2): owns a driver context, a host command
//! queue, an optional device-side queue, and the [`BufferRegistry`] of every
//! buffer created against it. `ContextBuilder::create` acquires driver
//! resources with strict rollback; `Context::destroy` releases them in
//! reverse order exactly once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::driver::{ContextHandle, ContextProperties, Driver, PriorityHint, QueueHandle};
use crate::error::{ContextError, DestroyWarning};
use crate::registry::BufferRegistry;

/// Opaque identifier assigned to a context when it joins the process-wide
/// context list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextStatus {
    Running,
    Closed,
}

/// The process-wide list contexts register into on creation. Serialized;
/// not a hot path (spec §5).
struct GlobalRegistry {
    ids: Mutex<Vec<ContextId>>,
    next_id: AtomicU64,
}

impl GlobalRegistry {
    fn instance() -> &'static GlobalRegistry {
        static INSTANCE: OnceLock<GlobalRegistry> = OnceLock::new();
        INSTANCE.get_or_init(|| GlobalRegistry {
            ids: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn register(&self) -> ContextId {
        let id = ContextId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.ids.lock().push(id);
        id
    }

    fn unregister(&self, id: ContextId) {
        self.ids.lock().retain(|&existing| existing != id);
    }

    /// Number of contexts currently registered. Exposed for tests asserting
    /// that `destroy()` actually removes the context.
    pub fn active_count() -> usize {
        Self::instance().ids.lock().len()
    }
}

struct ContextInner {
    id: ContextId,
    driver: Arc<dyn Driver>,
    handle: ContextHandle,
    queue: QueueHandle,
    device_queue: Option<QueueHandle>,
    out_of_order: bool,
    registry: BufferRegistry,
    status: Mutex<ContextStatus>,
}

/// A cheaply-cloneable handle to a device context. Every clone shares the
/// same underlying driver resources and [`BufferRegistry`].
#[derive(Clone)]
pub struct Context(Arc<ContextInner>);

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.0.id)
            .field("status", &*self.0.status.lock())
            .finish()
    }
}

impl Context {
    pub fn id(&self) -> ContextId {
        self.0.id
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.0.driver
    }

    pub fn handle(&self) -> ContextHandle {
        self.0.handle
    }

    pub fn queue(&self) -> QueueHandle {
        self.0.queue
    }

    pub fn device_queue(&self) -> Option<QueueHandle> {
        self.0.device_queue
    }

    pub fn out_of_order(&self) -> bool {
        self.0.out_of_order
    }

    pub fn status(&self) -> ContextStatus {
        *self.0.status.lock()
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.0.registry
    }

    /// Idempotent, ordered teardown: `registry.release_all` → device queue →
    /// host queue → context. Sub-failures are logged and swallowed — this
    /// method never fails (spec §4.2, §8 property 1).
    pub fn destroy(&self) {
        let mut status = self.0.status.lock();
        if *status == ContextStatus::Closed {
            return;
        }
        *status = ContextStatus::Closed;
        drop(status);

        self.0.registry.release_all();

        let mut warnings = Vec::new();
        if let Some(device_queue) = self.0.device_queue {
            if let Err(cause) = self.0.driver.release_command_queue(device_queue) {
                warnings.push(DestroyWarning {
                    step: "release_device_queue",
                    cause,
                });
            }
        }
        if let Err(cause) = self.0.driver.release_command_queue(self.0.queue) {
            warnings.push(DestroyWarning {
                step: "release_host_queue",
                cause,
            });
        }
        if let Err(cause) = self.0.driver.release_context(self.0.handle) {
            warnings.push(DestroyWarning {
                step: "release_context",
                cause,
            });
        }
        for warning in &warnings {
            tracing::warn!(context = %self.0.id, %warning, "context teardown step failed, continuing");
        }

        GlobalRegistry::instance().unregister(self.0.id);
    }

    /// Number of contexts currently live in the process-wide list.
    pub fn active_count() -> usize {
        GlobalRegistry::active_count()
    }
}

/// Builder for [`Context`]. Accepts queue-ordering, profiling, and
/// priority/throttle hints, plus an optional device-side queue size — all
/// mapped onto driver-supplied keys only when the device advertises the
/// corresponding extension (spec §4.2).
pub struct ContextBuilder {
    driver: Arc<dyn Driver>,
    properties: ContextProperties,
    device_version_at_least_2_0: bool,
    device_supports_on_device_queue: bool,
}

impl ContextBuilder {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            properties: ContextProperties::default(),
            device_version_at_least_2_0: true,
            device_supports_on_device_queue: false,
        }
    }

    pub fn out_of_order(mut self, enabled: bool) -> Self {
        self.properties.out_of_order = enabled;
        self
    }

    pub fn profiling(mut self, enabled: bool) -> Self {
        self.properties.profiling = enabled;
        self
    }

    pub fn priority(mut self, hint: PriorityHint) -> Self {
        self.properties.priority = Some(hint);
        self
    }

    pub fn throttle(mut self, hint: PriorityHint) -> Self {
        self.properties.throttle = Some(hint);
        self
    }

    pub fn device_queue_size(mut self, size: usize) -> Self {
        self.properties.device_queue_size = Some(size);
        self
    }

    pub fn device_version_at_least_2_0(mut self, value: bool) -> Self {
        self.device_version_at_least_2_0 = value;
        self
    }

    pub fn device_supports_on_device_queue(mut self, value: bool) -> Self {
        self.device_supports_on_device_queue = value;
        self
    }

    /// Acquires driver resources with strict rollback (spec §4.2 step list)
    /// and registers the new context in the process-wide list.
    pub fn create(self) -> Result<Context, ContextError> {
        let handle = self
            .driver
            .create_context(self.device_version_at_least_2_0)
            .map_err(ContextError::Create)?;

        let queue = match self.driver.create_command_queue(
            handle,
            &self.properties,
            self.device_version_at_least_2_0,
        ) {
            Ok(queue) => queue,
            Err(cause) => {
                let _ = self.driver.release_context(handle);
                return Err(ContextError::QueueCreate(cause));
            }
        };

        let device_queue = match self.properties.device_queue_size {
            Some(size) if self.device_supports_on_device_queue => {
                match self.driver.create_device_queue(handle, size) {
                    Ok(dq) => Some(dq),
                    Err(cause) => {
                        let _ = self.driver.release_command_queue(queue);
                        let _ = self.driver.release_context(handle);
                        return Err(ContextError::DeviceQueueCreate(cause));
                    }
                }
            }
            _ => None,
        };

        let id = GlobalRegistry::instance().register();
        Ok(Context(Arc::new(ContextInner {
            id,
            driver: self.driver,
            handle,
            queue,
            device_queue,
            out_of_order: self.properties.out_of_order,
            registry: BufferRegistry::new(),
            status: Mutex::new(ContextStatus::Running),
        })))
    }
}
