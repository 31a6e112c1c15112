use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

type Handler = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Handlers are keyed by event type, and optionally by event name.
type Topic = (TypeId, Option<String>);

/// Default maximum concurrent handlers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1024;

/// Sink for named lifecycle events.
///
/// The entity manager holds an `Arc<dyn EventDispatcher<E>>` and awaits
/// `dispatch` after each successful write.
pub trait EventDispatcher<E>: Send + Sync {
    fn dispatch<'a>(&'a self, event: E, name: &'static str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// In-process event bus with typed pub/sub and backpressure support.
///
/// Events are dispatched by `TypeId`. Subscribers register for a concrete
/// event type, or for one named event of that type, and receive an `Arc<E>`.
///
/// Backpressure is enforced via a semaphore that limits the number of
/// concurrently executing handlers. When the limit is reached, `emit()`
/// will wait until a slot becomes available.
///
/// `EventBus` is `Clone` and can be shared across threads.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<Topic, Vec<Handler>>>>,
    semaphore: Option<Arc<Semaphore>>,
}

impl EventBus {
    /// Create a new `EventBus` with default concurrency limit (1024).
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_MAX_CONCURRENCY)
    }

    /// Create a new `EventBus` with a custom concurrency limit.
    pub fn with_concurrency(max_concurrent: usize) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            semaphore: Some(Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    /// Create a new `EventBus` with no concurrency limit.
    pub fn unbounded() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            semaphore: None,
        }
    }

    /// Subscribe to every event of type `E`, whatever its name.
    pub async fn subscribe<E, F, Fut>(&self, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register((TypeId::of::<E>(), None), handler).await;
    }

    /// Subscribe to events of type `E` emitted under `name` (`entity.created`).
    pub async fn subscribe_to<E, F, Fut>(&self, name: &str, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register((TypeId::of::<E>(), Some(name.to_string())), handler)
            .await;
    }

    async fn register<E, F, Fut>(&self, topic: Topic, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |any| match any.downcast::<E>() {
            Ok(event) => Box::pin(handler(event)),
            Err(_) => Box::pin(async {}),
        });
        let mut handlers = self.handlers.write().await;
        handlers.entry(topic).or_default().push(handler);
    }

    /// Emit an event, spawning all type subscribers as concurrent tasks.
    ///
    /// Returns after all handlers have been spawned (not necessarily completed).
    pub async fn emit<E: Send + Sync + 'static>(&self, event: E) {
        let tasks = self.spawn_handlers(event, None).await;
        drop(tasks);
    }

    /// Emit an event and wait for all type subscribers to complete.
    pub async fn emit_and_wait<E: Send + Sync + 'static>(&self, event: E) {
        for task in self.spawn_handlers(event, None).await {
            let _ = task.await;
        }
    }

    /// Emit a named event and wait for its subscribers to complete.
    ///
    /// Both name subscribers and plain type subscribers are invoked.
    pub async fn emit_named<E: Send + Sync + 'static>(&self, name: &str, event: E) {
        for task in self.spawn_handlers(event, Some(name)).await {
            let _ = task.await;
        }
    }

    async fn spawn_handlers<E: Send + Sync + 'static>(
        &self,
        event: E,
        name: Option<&str>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let type_id = TypeId::of::<E>();
        let event = Arc::new(event) as Arc<dyn Any + Send + Sync>;
        let handlers = self.handlers.read().await;

        let mut topics = vec![(type_id, None)];
        if let Some(name) = name {
            topics.push((type_id, Some(name.to_string())));
        }

        let mut tasks = Vec::new();
        for topic in &topics {
            let Some(subs) = handlers.get(topic) else {
                continue;
            };
            for handler in subs {
                let h = handler.clone();
                let e = event.clone();
                match &self.semaphore {
                    Some(sem) => {
                        // Wait for a slot before spawning.
                        let Ok(permit) = sem.clone().acquire_owned().await else {
                            tracing::warn!("Event bus semaphore closed, dropping event");
                            return tasks;
                        };
                        tasks.push(tokio::spawn(async move {
                            h(e).await;
                            drop(permit);
                        }));
                    }
                    None => {
                        tasks.push(tokio::spawn(async move {
                            h(e).await;
                        }));
                    }
                }
            }
        }
        tasks
    }

    /// Returns the number of free handler slots, or `None` if unbounded.
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Remove every subscriber.
    pub async fn clear(&self) {
        self.handlers.write().await.clear();
    }
}

impl<E: Send + Sync + 'static> EventDispatcher<E> for EventBus {
    fn dispatch<'a>(&'a self, event: E, name: &'static str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(event = name, "Dispatching event");
            self.emit_named(name, event).await;
        })
    }
}

pub mod prelude {
    //! Re-exports of the most commonly used event types.
    pub use crate::{EventBus, EventDispatcher};
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("free_slots", &self.concurrency_limit())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestEvent {
        value: usize,
    }

    struct OtherEvent;

    #[tokio::test]
    async fn test_emit_and_subscribe() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        bus.subscribe(move |event: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(event.value, Ordering::SeqCst);
            }
        })
        .await;

        bus.emit_and_wait(TestEvent { value: 42 }).await;
        assert_eq!(counter.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn test_no_cross_type_dispatch() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        bus.subscribe(move |_: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        bus.emit_and_wait(OtherEvent).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_named_subscriber_only_sees_its_name() {
        let bus = EventBus::new();
        let created = Arc::new(AtomicUsize::new(0));
        let any = Arc::new(AtomicUsize::new(0));

        let c = created.clone();
        bus.subscribe_to("entity.created", move |_: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        let a = any.clone();
        bus.subscribe(move |_: Arc<TestEvent>| {
            let a = a.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        bus.emit_named("entity.created", TestEvent { value: 1 }).await;
        bus.emit_named("entity.updated", TestEvent { value: 1 }).await;
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(any.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_through_trait_object() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        bus.subscribe_to("entity.updated", move |event: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(event.value, Ordering::SeqCst);
            }
        })
        .await;

        let dispatcher: Arc<dyn EventDispatcher<TestEvent>> = Arc::new(bus.clone());
        dispatcher.dispatch(TestEvent { value: 7 }, "entity.updated").await;
        assert_eq!(counter.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_handler_panic_does_not_crash_emit_and_wait() {
        let bus = EventBus::new();

        bus.subscribe(move |_: Arc<TestEvent>| async move {
            panic!("boom in emit_and_wait");
        })
        .await;

        bus.emit_and_wait(TestEvent { value: 1 }).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.subscribe(move |_: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        bus.emit_and_wait(TestEvent { value: 1 }).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backpressure_limits_concurrency() {
        let bus = EventBus::with_concurrency(2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let (a, m) = (active.clone(), max_seen.clone());
        bus.subscribe(move |_: Arc<OtherEvent>| {
            let (active, max_seen) = (a.clone(), m.clone());
            async move {
                let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        for _ in 0..6 {
            bus.emit(OtherEvent).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_clear_removes_subscribers() {
        let bus = EventBus::unbounded();
        assert!(bus.concurrency_limit().is_none());
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.subscribe(move |_: Arc<TestEvent>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        bus.clear().await;
        bus.emit_and_wait(TestEvent { value: 1 }).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
