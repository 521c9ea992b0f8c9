//! Activation dispatcher — map modifier+key presses to bound elements.
//!
//! Holding the configured modifier arms the dispatcher (the overlay
//! shows while armed); releasing it goes back to idle. Activation does
//! not depend on that state: every key-down is checked against the
//! modifier flag on the event itself, and the registry is read at
//! dispatch time, so a pending rescan can never route a press to an
//! outdated binding.

pub mod event;

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::Modifier;
use crate::engine::registry::{Registry, ShortcutBinding};
use crate::tree::{ElementId, ElementTree};

pub use event::{KeyEvent, KeyEventKind};

/// Attribute set on an element while its activation pulse is showing.
pub const ACTIVE_MARKER: &str = "data-shortcut-active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Idle,
    Armed,
}

#[derive(Debug)]
pub struct Dispatcher {
    modifier: Modifier,
    pulse: Duration,
    state: ArmState,
    /// Elements showing the activation marker, with removal deadlines.
    pulses: Vec<(ElementId, Instant)>,
}

impl Dispatcher {
    pub fn new(modifier: Modifier, pulse: Duration) -> Self {
        Self {
            modifier,
            pulse,
            state: ArmState::Idle,
            pulses: Vec::new(),
        }
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    /// Return to idle, e.g. when the host window loses focus and the
    /// modifier release is never seen.
    pub fn disarm(&mut self) {
        self.state = ArmState::Idle;
    }

    /// Handle one key event. Returns `true` if it activated a binding,
    /// in which case the event's default action and propagation have
    /// been stopped.
    pub fn on_key_event<T: ElementTree + ?Sized>(
        &mut self,
        event: &mut KeyEvent,
        registry: &Registry,
        tree: &mut T,
        now: Instant,
    ) -> bool {
        if event.is_modifier_key(self.modifier) {
            self.state = match event.kind {
                KeyEventKind::Down => ArmState::Armed,
                KeyEventKind::Up => ArmState::Idle,
            };
            return false;
        }

        if event.kind != KeyEventKind::Down || !event.modifier_held(self.modifier) {
            return false;
        }

        let Some(key) = event.shortcut_key() else {
            return false;
        };
        let Some(binding) = registry.lookup_by_key(key) else {
            trace!(key = %key, "no binding, falling through");
            return false;
        };
        if !tree.is_attached(binding.element) {
            trace!(key = %key, element = %binding.element, "stale binding, falling through");
            return false;
        }

        event.prevent_default();
        event.stop_propagation();
        self.activate(binding, tree, now);
        true
    }

    fn activate<T: ElementTree + ?Sized>(
        &mut self,
        binding: &ShortcutBinding,
        tree: &mut T,
        now: Instant,
    ) {
        debug!(
            chord = %binding.chord(),
            element = %binding.element,
            label = %binding.label,
            "activating"
        );
        tree.activate(binding.element);
        tree.set_attr(binding.element, ACTIVE_MARKER, "");

        let deadline = now + self.pulse;
        match self.pulses.iter_mut().find(|(id, _)| *id == binding.element) {
            Some(entry) => entry.1 = deadline,
            None => self.pulses.push((binding.element, deadline)),
        }
    }

    /// Earliest pending marker removal.
    pub fn next_pulse_deadline(&self) -> Option<Instant> {
        self.pulses.iter().map(|(_, deadline)| *deadline).min()
    }

    /// Remove markers whose pulse has elapsed. Returns how many.
    pub fn expire<T: ElementTree + ?Sized>(&mut self, tree: &mut T, now: Instant) -> usize {
        let before = self.pulses.len();
        self.pulses.retain(|(element, deadline)| {
            if *deadline > now {
                return true;
            }
            tree.remove_attr(*element, ACTIVE_MARKER);
            false
        });
        before - self.pulses.len()
    }

    /// Remove every pending marker now, regardless of deadline.
    pub fn clear_pulses<T: ElementTree + ?Sized>(&mut self, tree: &mut T) -> usize {
        for (element, _) in &self.pulses {
            tree.remove_attr(*element, ACTIVE_MARKER);
        }
        std::mem::take(&mut self.pulses).len()
    }
}
