// Chart adapter - owns one chart instance bound to a canvas
use crate::application::chart_backend::{ChartBackend, ChartHandle, UpdateMode};
use crate::application::document::Document;
use crate::domain::chart::{ChartKind, ChartSeries};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub struct ChartAdapter {
    id: String,
    canvas: String,
    kind: ChartKind,
    backend: Arc<dyn ChartBackend>,
    handle: Option<ChartHandle>,
    series: Option<ChartSeries>,
    resize_debounce: Duration,
    resize_due: Option<Instant>,
}

impl ChartAdapter {
    pub fn new(
        id: impl Into<String>,
        canvas: impl Into<String>,
        kind: ChartKind,
        backend: Arc<dyn ChartBackend>,
        resize_debounce: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            canvas: canvas.into(),
            kind,
            backend,
            handle: None,
            series: None,
            resize_debounce,
            resize_due: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_rendered(&self) -> bool {
        self.handle.is_some()
    }

    pub fn series(&self) -> Option<&ChartSeries> {
        self.series.as_ref()
    }

    /// Create the chart with an animated first draw. A missing canvas or a
    /// malformed series disables the chart (logged) instead of failing.
    /// Rendering again destroys the previous instance first.
    pub fn render(&mut self, doc: &dyn Document, series: ChartSeries) -> bool {
        if !doc.exists(&self.canvas) {
            tracing::warn!("Chart {} disabled - canvas {} not found", self.id, self.canvas);
            return false;
        }
        if let Err(problem) = series.validate() {
            tracing::warn!("Chart {} not rendered - malformed series: {:?}", self.id, problem);
            return false;
        }

        self.destroy();
        match self
            .backend
            .create(&self.canvas, self.kind, &series, UpdateMode::Animated)
        {
            Ok(handle) => {
                tracing::debug!("Rendered chart {} with {} points", self.id, series.len());
                self.handle = Some(handle);
                self.series = Some(series);
                true
            }
            Err(e) => {
                tracing::warn!("Chart {} disabled: {}", self.id, e);
                false
            }
        }
    }

    /// Swap the data in place without animation.
    pub fn update(&mut self, series: ChartSeries) -> bool {
        let Some(handle) = self.handle else {
            tracing::debug!("Skipping update for chart {} - not rendered", self.id);
            return false;
        };
        if let Err(problem) = series.validate() {
            tracing::warn!("Skipping update for chart {} - malformed series: {:?}", self.id, problem);
            return false;
        }
        match self.backend.update(handle, &series, UpdateMode::Silent) {
            Ok(()) => {
                self.series = Some(series);
                true
            }
            Err(e) => {
                tracing::warn!("Chart {} update failed: {}", self.id, e);
                false
            }
        }
    }

    /// Ask for a resize. Calls within the debounce window collapse into one,
    /// performed by [`ChartAdapter::flush_resize`].
    pub fn request_resize(&mut self, now: Instant) {
        if self.handle.is_some() && self.resize_due.is_none() {
            self.resize_due = Some(now + self.resize_debounce);
        }
    }

    pub fn resize_due(&self) -> Option<Instant> {
        self.resize_due
    }

    pub fn flush_resize(&mut self, now: Instant) -> bool {
        match (self.resize_due, self.handle) {
            (Some(due), Some(handle)) if due <= now => {
                self.resize_due = None;
                self.resize(handle);
                true
            }
            _ => false,
        }
    }

    fn resize(&self, handle: ChartHandle) {
        if let Err(e) = self.backend.resize(handle) {
            tracing::warn!("Chart {} resize failed: {}", self.id, e);
        }
    }

    /// Release the chart instance. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.destroy(handle);
            tracing::debug!("Destroyed chart {}", self.id);
        }
        self.resize_due = None;
    }
}

impl Drop for ChartAdapter {
    fn drop(&mut self) {
        self.destroy();
    }
}
