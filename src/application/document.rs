// Document trait - the page surface controllers write to

/// Selector-addressed view of the page.
///
/// Every operation reports whether the target existed; a missing element is
/// never an error since each dashboard renders a different subset.
pub trait Document: Send + Sync {
    fn exists(&self, selector: &str) -> bool;

    fn text(&self, selector: &str) -> Option<String>;

    fn set_text(&self, selector: &str, text: &str) -> bool;

    fn has_class(&self, selector: &str, class: &str) -> bool;

    fn add_class(&self, selector: &str, class: &str) -> bool;

    fn remove_class(&self, selector: &str, class: &str) -> bool;

    fn set_disabled(&self, selector: &str, disabled: bool) -> bool;

    /// Append a child element; it becomes addressable as `#<id>`.
    fn append_element(&self, parent: &str, id: &str, class: &str, text: &str) -> bool;

    fn remove_element(&self, selector: &str) -> bool;

    fn toggle_class(&self, selector: &str, class: &str, on: bool) -> bool {
        if on {
            self.add_class(selector, class)
        } else {
            self.remove_class(selector, class)
        }
    }
}
