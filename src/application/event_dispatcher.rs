// Delegated UI events keyed by `data-action`
use std::collections::HashMap;

/// A user interaction, described by the `data-action` / `data-value`
/// attributes of the element it hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub action: String,
    pub value: Option<String>,
}

impl UiEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            value: None,
        }
    }

    pub fn with_value(action: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            value: Some(value.into()),
        }
    }
}

type Handler<C> = Box<dyn Fn(&UiEvent) -> Option<C> + Send + Sync>;

/// Single entry point for page events. Each action has at most one handler;
/// registering again replaces it, so re-rendered fragments never stack
/// duplicate listeners.
pub struct ActionDispatcher<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for ActionDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> ActionDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an existing handler was replaced.
    pub fn register<F>(&mut self, action: &str, handler: F) -> bool
    where
        F: Fn(&UiEvent) -> Option<C> + Send + Sync + 'static,
    {
        self.handlers
            .insert(action.to_string(), Box::new(handler))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, event: &UiEvent) -> Option<C> {
        match self.handlers.get(&event.action) {
            Some(handler) => handler(event),
            None => {
                tracing::debug!("No handler for action {}", event.action);
                None
            }
        }
    }
}
