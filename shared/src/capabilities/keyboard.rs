use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.code` (or `key`) value.
    pub fn from_code(code: &str) -> Self {
        match code {
            "Escape" | "Esc" => Self::Escape,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key-sub-{}", self.0)
    }
}

/// Listener bookkeeping the shell mirrors: install on `Subscribe`,
/// remove on `Unsubscribe`.
///
/// A `Subscribe` request stays open. The shell resolves it with the pressed
/// [`Key`] every time one arrives, and drops it on the matching `Unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardOperation {
    Subscribe { id: SubscriptionId, key: Key },
    Unsubscribe { id: SubscriptionId },
}

impl Operation for KeyboardOperation {
    type Output = Key;
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    live: Mutex<BTreeSet<SubscriptionId>>,
}

impl Registry {
    fn live(&self) -> MutexGuard<'_, BTreeSet<SubscriptionId>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.live().insert(id);
        id
    }

    fn is_live(&self, id: SubscriptionId) -> bool {
        self.live().contains(&id)
    }

    fn release(&self, id: SubscriptionId) -> bool {
        self.live().remove(&id)
    }
}

/// Scoped global key bindings.
///
/// A binding lives exactly as long as the [`KeySubscription`] returned by
/// [`Keyboard::subscribe`]; dropping the guard stops forwarding presses and
/// tells the shell to uninstall its listener.
pub struct Keyboard<Ev> {
    context: CapabilityContext<KeyboardOperation, Ev>,
    registry: Arc<Registry>,
}

impl<Ev> Clone for Keyboard<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<Ev> Capability<Ev> for Keyboard<Ev> {
    type Operation = KeyboardOperation;
    type MappedSelf<MappedEv> = Keyboard<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Keyboard {
            context: self.context.map_event(f),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<Ev> Keyboard<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<KeyboardOperation, Ev>) -> Self {
        Self {
            context,
            registry: Arc::default(),
        }
    }

    #[must_use = "the binding is released as soon as the subscription is dropped"]
    pub fn subscribe<F>(&self, key: Key, make_event: F) -> KeySubscription
    where
        F: Fn() -> Ev + Send + 'static,
    {
        let id = self.registry.allocate();
        let registry = Arc::downgrade(&self.registry);
        let context = self.context.clone();

        self.context.spawn(async move {
            let operation = KeyboardOperation::Subscribe {
                id,
                key: key.clone(),
            };
            let mut presses = context.stream_from_shell(operation);
            while let Some(pressed) = presses.next().await {
                let still_bound = registry
                    .upgrade()
                    .is_some_and(|registry| registry.is_live(id));
                if !still_bound {
                    break;
                }
                if pressed == key {
                    context.update_app(make_event());
                }
            }
        });

        let context = self.context.clone();
        KeySubscription {
            id,
            registry: Arc::downgrade(&self.registry),
            release: Some(Box::new(move || {
                let shell = context.clone();
                context.spawn(async move {
                    shell
                        .notify_shell(KeyboardOperation::Unsubscribe { id })
                        .await;
                });
            })),
        }
    }

    pub fn active_count(&self) -> usize {
        self.registry.live().len()
    }
}

/// RAII guard for one key binding.
pub struct KeySubscription {
    id: SubscriptionId,
    registry: Weak<Registry>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl KeySubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for KeySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySubscription").field("id", &self.id).finish()
    }
}

impl Drop for KeySubscription {
    fn drop(&mut self) {
        // Without the capabilities there is no executor left to reach the shell.
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.release(self.id) {
            if let Some(release) = self.release.take() {
                release();
            }
            debug!(subscription = %self.id, "key binding released");
        }
    }
}
