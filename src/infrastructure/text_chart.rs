// Text chart backend - draws series as one line of text into the canvas element
use crate::application::chart_backend::{ChartBackend, ChartError, ChartHandle, UpdateMode};
use crate::application::document::Document;
use crate::domain::chart::{ChartKind, ChartSeries};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct Drawn {
    canvas: String,
    kind: ChartKind,
}

pub struct TextChartBackend {
    doc: Arc<dyn Document>,
    charts: Mutex<HashMap<ChartHandle, Drawn>>,
    next: Mutex<u64>,
}

impl TextChartBackend {
    pub fn new(doc: Arc<dyn Document>) -> Self {
        Self {
            doc,
            charts: Mutex::new(HashMap::new()),
            next: Mutex::new(0),
        }
    }

    pub fn live(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChartHandle, Drawn>> {
        self.charts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pie and doughnut slices carry their share; line and bar points do not.
pub fn draw(kind: ChartKind, series: &ChartSeries) -> String {
    let total = series.total();
    let points: Vec<String> = series
        .pairs()
        .map(|(label, value)| match kind {
            ChartKind::Pie | ChartKind::Doughnut if total > 0.0 => {
                format!("{} {} ({:.0}%)", label, value, value / total * 100.0)
            }
            _ => format!("{} {}", label, value),
        })
        .collect();
    let kind = match kind {
        ChartKind::Pie => "pie",
        ChartKind::Doughnut => "doughnut",
        ChartKind::Line => "line",
        ChartKind::Bar => "bar",
    };
    format!("{}: {}", kind, points.join(" | "))
}

impl ChartBackend for TextChartBackend {
    fn create(
        &self,
        canvas: &str,
        kind: ChartKind,
        series: &ChartSeries,
        mode: UpdateMode,
    ) -> Result<ChartHandle, ChartError> {
        if !self.doc.set_text(canvas, &draw(kind, series)) {
            return Err(ChartError::CanvasUnavailable(canvas.to_string()));
        }
        let handle = {
            let mut next = self.next.lock().unwrap_or_else(|p| p.into_inner());
            *next += 1;
            ChartHandle(*next)
        };
        tracing::debug!("Drew {:?} chart into {} ({:?})", kind, canvas, mode);
        self.lock().insert(
            handle,
            Drawn {
                canvas: canvas.to_string(),
                kind,
            },
        );
        Ok(handle)
    }

    fn update(
        &self,
        handle: ChartHandle,
        series: &ChartSeries,
        _mode: UpdateMode,
    ) -> Result<(), ChartError> {
        let charts = self.lock();
        let drawn = charts.get(&handle).ok_or(ChartError::UnknownHandle(handle))?;
        self.doc.set_text(&drawn.canvas, &draw(drawn.kind, series));
        Ok(())
    }

    fn resize(&self, handle: ChartHandle) -> Result<(), ChartError> {
        if self.lock().contains_key(&handle) {
            Ok(())
        } else {
            Err(ChartError::UnknownHandle(handle))
        }
    }

    fn destroy(&self, handle: ChartHandle) {
        if let Some(drawn) = self.lock().remove(&handle) {
            self.doc.set_text(&drawn.canvas, "");
        }
    }
}
