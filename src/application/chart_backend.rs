// Chart backend trait - the charting library behind a canvas
use crate::domain::chart::{ChartKind, ChartSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Initial render.
    Animated,
    /// Polling updates; no transition.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    #[error("Canvas {0} is not available")]
    CanvasUnavailable(String),

    #[error("Unknown chart handle {0:?}")]
    UnknownHandle(ChartHandle),
}

pub trait ChartBackend: Send + Sync {
    fn create(
        &self,
        canvas: &str,
        kind: ChartKind,
        series: &ChartSeries,
        mode: UpdateMode,
    ) -> Result<ChartHandle, ChartError>;

    fn update(
        &self,
        handle: ChartHandle,
        series: &ChartSeries,
        mode: UpdateMode,
    ) -> Result<(), ChartError>;

    fn resize(&self, handle: ChartHandle) -> Result<(), ChartError>;

    /// Release the chart and its canvas listeners.
    fn destroy(&self, handle: ChartHandle);
}
