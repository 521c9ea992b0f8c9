//! Session event loop.
//!
//! A [`Session`] owns the tree, the engine and the dispatcher and runs
//! them from a single task. Tree-change notifications, host commands,
//! the debounce deadline and activation-pulse expiry are all handled in
//! one `select!`, so the registry is never touched concurrently and
//! needs no lock.
//!
//! Qualifying tree changes (structural insert/remove, or a flip of
//! `disabled`, `aria-disabled` or the opt-out attribute) push the
//! debounce deadline back; when it finally elapses every mounted
//! container is rescanned once.

use futures::future::OptionFuture;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, info, info_span, trace};
use uuid::Uuid;

use crate::config::Config;
use crate::dispatch::{Dispatcher, KeyEvent};
use crate::engine::{ShortcutBinding, ShortcutEngine};
use crate::tree::{ElementId, ElementTree, TreeChange};

use super::SessionError;
use super::debounce::Debouncer;

/// What the overlay renderer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySnapshot {
    /// Whether the modifier is currently held.
    pub armed: bool,
    /// Every current binding.
    pub bindings: Vec<ShortcutBinding>,
    /// Incremented on every publish.
    pub generation: u64,
}

/// Host request to a running session.
pub enum Command<T> {
    Key {
        event: KeyEvent,
        reply: Option<oneshot::Sender<bool>>,
    },
    /// Start tracking a container and scan it now.
    Mount(ElementId),
    /// Stop tracking a container and release its bindings.
    Unmount(ElementId),
    /// Mutate the tree from inside the session task.
    Edit(Box<dyn FnOnce(&mut T) + Send>),
    /// Rescan all containers now, dropping any pending debounce.
    Rescan,
    /// The host lost focus; the modifier release will not arrive.
    Blur,
    Shutdown,
}

/// Cloneable sender side of a session.
pub struct SessionHandle<T> {
    commands: UnboundedSender<Command<T>>,
    overlay: watch::Receiver<OverlaySnapshot>,
}

impl<T> Clone for SessionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            overlay: self.overlay.clone(),
        }
    }
}

impl<T> SessionHandle<T> {
    fn send(&self, command: Command<T>) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// Deliver a key event. Resolves to whether it activated a binding.
    pub async fn key(&self, event: KeyEvent) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Key {
            event,
            reply: Some(tx),
        })?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn mount(&self, container: ElementId) -> Result<(), SessionError> {
        self.send(Command::Mount(container))
    }

    pub fn unmount(&self, container: ElementId) -> Result<(), SessionError> {
        self.send(Command::Unmount(container))
    }

    pub fn edit(&self, f: impl FnOnce(&mut T) + Send + 'static) -> Result<(), SessionError> {
        self.send(Command::Edit(Box::new(f)))
    }

    pub fn rescan(&self) -> Result<(), SessionError> {
        self.send(Command::Rescan)
    }

    pub fn blur(&self) -> Result<(), SessionError> {
        self.send(Command::Blur)
    }

    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown)
    }

    /// Subscribe to overlay snapshots.
    pub fn overlay(&self) -> watch::Receiver<OverlaySnapshot> {
        self.overlay.clone()
    }
}

pub struct Session<T> {
    id: Uuid,
    tree: T,
    engine: ShortcutEngine,
    dispatcher: Dispatcher,
    debouncer: Debouncer,
    containers: Vec<ElementId>,
    changes: UnboundedReceiver<TreeChange>,
    commands: UnboundedReceiver<Command<T>>,
    overlay: watch::Sender<OverlaySnapshot>,
}

impl<T: ElementTree> Session<T> {
    /// Create a session over `tree`, fed tree mutations on `changes`.
    pub fn new(
        config: Config,
        tree: T,
        changes: UnboundedReceiver<TreeChange>,
    ) -> (Self, SessionHandle<T>) {
        let (commands_tx, commands_rx) = unbounded_channel();
        let (overlay_tx, overlay_rx) = watch::channel(OverlaySnapshot::default());

        let session = Self {
            id: Uuid::new_v4(),
            dispatcher: Dispatcher::new(config.modifier, config.pulse),
            debouncer: Debouncer::new(config.debounce),
            engine: ShortcutEngine::new(config),
            tree,
            containers: Vec::new(),
            changes,
            commands: commands_rx,
            overlay: overlay_tx,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            overlay: overlay_rx,
        };
        (session, handle)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run until [`Command::Shutdown`] or until every handle is dropped.
    /// Releases all bindings and hands the tree back.
    pub async fn run(self) -> T {
        let span = info_span!("session", id = %self.id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> T {
        info!("session started");
        let mut changes_open = true;

        loop {
            let debounce = OptionFuture::from(self.debouncer.deadline().map(sleep_until));
            let pulse = OptionFuture::from(self.dispatcher.next_pulse_deadline().map(sleep_until));

            tokio::select! {
                change = self.changes.recv(), if changes_open => match change {
                    Some(change) => self.on_change(change),
                    None => {
                        debug!("tree change feed closed");
                        changes_open = false;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                Some(()) = debounce => {
                    if self.debouncer.fire(Instant::now()) {
                        self.rescan_all();
                    }
                },
                Some(()) = pulse => {
                    self.dispatcher.expire(&mut self.tree, Instant::now());
                },
            }
        }

        self.dispatcher.clear_pulses(&mut self.tree);
        let released = self.engine.dispose();
        self.containers.clear();
        self.publish();
        info!(released, "session stopped");
        self.tree
    }

    fn on_change(&mut self, change: TreeChange) {
        if self.qualifies(&change) {
            trace!(?change, "rescan scheduled");
            self.debouncer.trigger(Instant::now());
        }
    }

    fn qualifies(&self, change: &TreeChange) -> bool {
        match change {
            TreeChange::ChildrenChanged { added, removed, .. } => {
                !added.is_empty() || !removed.is_empty()
            }
            TreeChange::AttributeChanged { name, .. } => {
                name == "disabled"
                    || name == "aria-disabled"
                    || *name == self.engine.config().opt_out_attribute
            }
        }
    }

    fn on_command(&mut self, command: Command<T>) {
        match command {
            Command::Key { mut event, reply } => {
                let was_armed = self.dispatcher.is_armed();
                let handled = self.dispatcher.on_key_event(
                    &mut event,
                    self.engine.registry(),
                    &mut self.tree,
                    Instant::now(),
                );
                if was_armed != self.dispatcher.is_armed() {
                    self.publish();
                }
                if let Some(reply) = reply {
                    // The caller may have stopped waiting.
                    let _ = reply.send(handled);
                }
            }
            Command::Mount(container) => {
                if !self.containers.contains(&container) {
                    self.containers.push(container);
                }
                self.engine.scan(&self.tree, container);
                self.publish();
            }
            Command::Unmount(container) => {
                self.containers.retain(|c| *c != container);
                let released = self.engine.release_container(&self.tree, container);
                debug!(container = %container, released, "container unmounted");
                self.publish();
            }
            Command::Edit(f) => f(&mut self.tree),
            Command::Rescan => {
                self.debouncer.cancel();
                self.rescan_all();
            }
            Command::Blur => {
                if self.dispatcher.is_armed() {
                    self.dispatcher.disarm();
                    self.publish();
                }
            }
            Command::Shutdown => {}
        }
    }

    fn rescan_all(&mut self) {
        let containers = std::mem::take(&mut self.containers);
        for container in containers {
            // Scanning a detached container releases its bindings.
            self.engine.scan(&self.tree, container);
            if self.tree.is_attached(container) {
                self.containers.push(container);
            } else {
                debug!(container = %container, "container detached, dropped");
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let armed = self.dispatcher.is_armed();
        let bindings = self.engine.bindings();
        self.overlay.send_modify(|snapshot| {
            snapshot.armed = armed;
            snapshot.bindings = bindings;
            snapshot.generation += 1;
        });
    }
}
