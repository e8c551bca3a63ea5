use std::collections::HashMap;

use super::events::{InputEvent, InputEventKind};

/// Handle returned when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&InputEvent)>;

/// Listener registry keyed by event kind
///
/// Listeners for one kind run in registration order. The owning lifecycle
/// clears the registry when it stops, so nothing registered here outlives it.
#[derive(Default)]
pub struct EventDispatcher {
    next_id: u64,
    listeners: HashMap<InputEventKind, Vec<(ListenerId, Listener)>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&mut self, kind: InputEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&InputEvent) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when `id` was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(index) = listeners.iter().position(|(other, _)| *other == id) {
                listeners.remove(index);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every listener of its kind, returning how many ran
    pub fn dispatch(&mut self, event: &InputEvent) -> usize {
        match self.listeners.get_mut(&event.kind()) {
            Some(listeners) => {
                for (_, listener) in listeners.iter_mut() {
                    listener(event);
                }
                listeners.len()
            }
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
