// In-memory document used by the console front end and by tests
use crate::application::document::Document;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct Element {
    text: String,
    classes: BTreeSet<String>,
    disabled: bool,
    parent: Option<String>,
    children: Vec<String>,
}

/// Cheap to clone; clones share the same element tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: Arc<Mutex<BTreeMap<String, Element>>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str, text: &str) -> Self {
        self.insert(selector, text);
        self
    }

    pub fn insert(&self, selector: &str, text: &str) {
        let mut elements = self.lock();
        let element = elements.entry(selector.to_string()).or_default();
        element.text = text.to_string();
    }

    pub fn is_disabled(&self, selector: &str) -> bool {
        self.lock().get(selector).is_some_and(|e| e.disabled)
    }

    pub fn classes(&self, selector: &str) -> Vec<String> {
        self.lock()
            .get(selector)
            .map(|e| e.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Child selectors in insertion order.
    pub fn children(&self, parent: &str) -> Vec<String> {
        self.lock()
            .get(parent)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    /// One line per top-level element, children indented beneath their parent.
    pub fn render(&self) -> String {
        let elements = self.lock();
        let mut out = String::new();
        for (selector, element) in elements.iter().filter(|(_, e)| e.parent.is_none()) {
            render_element(&elements, selector, element, 0, &mut out);
        }
        out
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Element>> {
        self.elements.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_element_mut<R>(&self, selector: &str, f: impl FnOnce(&mut Element) -> R) -> Option<R> {
        self.lock().get_mut(selector).map(f)
    }
}

fn render_element(
    elements: &BTreeMap<String, Element>,
    selector: &str,
    element: &Element,
    depth: usize,
    out: &mut String,
) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(selector);
    if !element.classes.is_empty() {
        let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
        out.push_str(&format!(" [{}]", classes.join(" ")));
    }
    if element.disabled {
        out.push_str(" (disabled)");
    }
    if !element.text.is_empty() {
        out.push_str(": ");
        out.push_str(&element.text);
    }
    out.push('\n');
    for child in &element.children {
        if let Some(c) = elements.get(child) {
            render_element(elements, child, c, depth + 1, out);
        }
    }
}

impl Document for MemoryDocument {
    fn exists(&self, selector: &str) -> bool {
        self.lock().contains_key(selector)
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.lock().get(selector).map(|e| e.text.clone())
    }

    fn set_text(&self, selector: &str, text: &str) -> bool {
        self.with_element_mut(selector, |e| e.text = text.to_string())
            .is_some()
    }

    fn has_class(&self, selector: &str, class: &str) -> bool {
        self.lock()
            .get(selector)
            .is_some_and(|e| e.classes.contains(class))
    }

    fn add_class(&self, selector: &str, class: &str) -> bool {
        self.with_element_mut(selector, |e| {
            e.classes.insert(class.to_string());
        })
        .is_some()
    }

    fn remove_class(&self, selector: &str, class: &str) -> bool {
        self.with_element_mut(selector, |e| {
            e.classes.remove(class);
        })
        .is_some()
    }

    fn set_disabled(&self, selector: &str, disabled: bool) -> bool {
        self.with_element_mut(selector, |e| e.disabled = disabled)
            .is_some()
    }

    fn append_element(&self, parent: &str, id: &str, class: &str, text: &str) -> bool {
        let mut elements = self.lock();
        let selector = format!("#{}", id);
        if elements.contains_key(&selector) {
            return false;
        }
        match elements.get_mut(parent) {
            Some(p) => p.children.push(selector.clone()),
            None => return false,
        }
        elements.insert(
            selector,
            Element {
                text: text.to_string(),
                classes: class.split_whitespace().map(str::to_string).collect(),
                parent: Some(parent.to_string()),
                ..Element::default()
            },
        );
        true
    }

    fn remove_element(&self, selector: &str) -> bool {
        let mut elements = self.lock();
        let Some(removed) = elements.remove(selector) else {
            return false;
        };
        if let Some(parent) = removed.parent.as_deref().and_then(|p| elements.get_mut(p)) {
            parent.children.retain(|c| c != selector);
        }
        let mut pending = removed.children;
        while let Some(child) = pending.pop() {
            if let Some(e) = elements.remove(&child) {
                pending.extend(e.children);
            }
        }
        true
    }
}
