// Dashboard live-update controller - one per page, owns every moving part
use crate::application::chart_adapter::ChartAdapter;
use crate::application::chart_backend::ChartBackend;
use crate::application::document::Document;
use crate::application::event_dispatcher::{ActionDispatcher, UiEvent};
use crate::application::notification_queue::NotificationQueue;
use crate::application::preference_store::PreferenceStore;
use crate::application::refresh_scheduler::{Completion, FetchTicket, RefreshScheduler};
use crate::application::stat_patcher::{DisplayValue, StatPatcher, StatUpdate};
use crate::application::stats_source::{FetchError, StatsSource};
use crate::domain::chart::{ChartSeries, GrowthPoint, growth_series};
use crate::domain::format::{Locale, format_clock, format_currency, format_number};
use crate::domain::notification::{Notification, NotificationId, Severity};
use crate::domain::refresh::RefreshState;
use crate::domain::stats::{DashboardStats, StatValue};
use crate::infrastructure::config::{DashboardConfig, StatBinding, StatFormat};
use crate::infrastructure::page_data::PageData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const REFRESH_FAILED: &str = "Failed to refresh dashboard";
const GROWTH_FAILED: &str = "Error updating chart";
const THEME_TOAST: Duration = Duration::from_secs(2);
const DEFAULT_GROWTH_PERIOD: &str = "6months";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ManualRefresh,
    Visibility(bool),
    ToggleSidebar,
    ToggleTheme,
    Dismiss(NotificationId),
    GrowthPeriod(String),
    Unload,
}

/// The page's `data-action` vocabulary.
pub fn dashboard_actions() -> ActionDispatcher<Command> {
    let mut actions = ActionDispatcher::new();
    actions.register("refresh", |_| Some(Command::ManualRefresh));
    actions.register("toggle-sidebar", |_| Some(Command::ToggleSidebar));
    actions.register("toggle-theme", |_| Some(Command::ToggleTheme));
    actions.register("unload", |_| Some(Command::Unload));
    actions.register("dismiss-notification", |e: &UiEvent| {
        let id = e.value.as_deref()?.trim_start_matches("toast-").parse().ok()?;
        Some(Command::Dismiss(NotificationId(id)))
    });
    actions.register("growth-period", |e: &UiEvent| {
        e.value.clone().map(Command::GrowthPeriod)
    });
    actions.register("visibility", |e: &UiEvent| match e.value.as_deref() {
        Some("visible") => Some(Command::Visibility(true)),
        Some("hidden") => Some(Command::Visibility(false)),
        _ => None,
    });
    actions
}

/// How a bound stat is shown. `None` when a count is not numeric.
pub fn display_value(binding: &StatBinding, raw: &StatValue, locale: Locale) -> Option<DisplayValue> {
    let value = match binding.format {
        StatFormat::Count => DisplayValue::Count(raw.as_integer()?),
        StatFormat::Number => DisplayValue::Text(format_number(raw.as_integer()?, locale)),
        StatFormat::Currency => DisplayValue::Text(match raw {
            StatValue::Number(n) => format_currency(*n, locale),
            StatValue::Text(s) => s.clone(),
        }),
        StatFormat::Text => DisplayValue::Text(match raw {
            StatValue::Number(n) => n.to_string(),
            StatValue::Text(s) => s.clone(),
        }),
    };
    Some(value)
}

#[derive(Debug)]
pub enum FetchReport {
    Stats {
        seq: u64,
        result: Result<DashboardStats, FetchError>,
    },
    Growth {
        seq: u64,
        period: String,
        manual: bool,
        result: Result<Vec<GrowthPoint>, FetchError>,
    },
}

pub struct DashboardController {
    config: DashboardConfig,
    doc: Arc<dyn Document>,
    source: Arc<dyn StatsSource>,
    preferences: Arc<dyn PreferenceStore>,
    scheduler: RefreshScheduler,
    patcher: StatPatcher,
    notifications: NotificationQueue,
    charts: Vec<ChartAdapter>,
    sidebar_collapsed: bool,
    dark_theme: bool,
    growth_seq: u64,
    reports_tx: mpsc::Sender<FetchReport>,
    reports_rx: Option<mpsc::Receiver<FetchReport>>,
    tasks: Vec<JoinHandle<()>>,
}

impl DashboardController {
    pub fn new(
        config: DashboardConfig,
        doc: Arc<dyn Document>,
        source: Arc<dyn StatsSource>,
        chart_backend: Arc<dyn ChartBackend>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let charts = config
            .charts
            .iter()
            .map(|c| {
                ChartAdapter::new(
                    c.id.clone(),
                    c.canvas.clone(),
                    c.kind,
                    chart_backend.clone(),
                    config.animation.resize_debounce,
                )
            })
            .collect();
        let (reports_tx, reports_rx) = mpsc::channel(16);

        Self {
            scheduler: RefreshScheduler::new(config.refresh_interval, config.request_timeout),
            patcher: StatPatcher::new(config.animation.clone()),
            notifications: NotificationQueue::new(
                config.selectors.toast_container.clone(),
                config.notifications.clone(),
            ),
            charts,
            config,
            doc,
            source,
            preferences,
            sidebar_collapsed: false,
            dark_theme: false,
            growth_seq: 0,
            reports_tx,
            reports_rx: Some(reports_rx),
            tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.scheduler.state()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.active()
    }

    pub fn is_sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn is_dark_theme(&self) -> bool {
        self.dark_theme
    }

    /// Page init: restore the theme, draw the initial charts, start the timer.
    pub fn mount(&mut self, page: &PageData, now: Instant) {
        self.dark_theme = self.preferences.get(&self.config.theme_key).as_deref() == Some("true");
        if self.dark_theme {
            self.doc.add_class(&self.config.selectors.body, "dark-theme");
        }

        let initial_stats = page.initial_stats();
        let mut growth_missing = false;
        for index in 0..self.charts.len() {
            let id = self.charts[index].id().to_string();
            let is_growth = self.config.growth_chart.as_deref() == Some(id.as_str());
            let series = if let Some(series) = page.charts.get(&id) {
                Some(series.clone())
            } else if is_growth && !page.growth_data.is_empty() {
                Some(growth_series(&page.growth_data))
            } else {
                self.series_from_stats(&id, &initial_stats)
            };

            match series {
                Some(series) => {
                    self.charts[index].render(self.doc.as_ref(), series);
                }
                None if is_growth => growth_missing = true,
                None => tracing::debug!("No initial data for chart {}", id),
            }
        }

        self.scheduler.start(now);
        tracing::info!(
            "Dashboard {} mounted, refreshing every {:?}",
            self.config.name,
            self.config.refresh_interval
        );

        if growth_missing {
            let period = page
                .growth_period
                .clone()
                .unwrap_or_else(|| DEFAULT_GROWTH_PERIOD.to_string());
            self.load_growth(period, false);
        }
    }

    /// Drive the page until `Unload` arrives or every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let Some(mut reports) = self.reports_rx.take() else {
            tracing::warn!("Dashboard {} is already running", self.config.name);
            return;
        };
        let interval = self.scheduler.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.scheduler.start(Instant::now());

        loop {
            let wake = self.next_deadline(Instant::now());
            tokio::select! {
                _ = ticker.tick() => self.on_tick(Instant::now()),
                command = commands.recv() => match command {
                    Some(Command::Unload) | None => break,
                    Some(command) => self.handle(command, Instant::now()),
                },
                Some(report) = reports.recv() => self.apply_report(report, Instant::now()),
                _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                    self.advance(Instant::now());
                }
            }
        }

        self.unload();
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::ManualRefresh => self.trigger_manual_refresh(now),
            Command::Visibility(visible) => self.on_visibility_change(visible, now),
            Command::ToggleSidebar => self.toggle_sidebar(now),
            Command::ToggleTheme => self.toggle_theme(now),
            Command::Dismiss(id) => {
                self.notifications.dismiss(self.doc.as_ref(), id, now);
            }
            Command::GrowthPeriod(period) => self.load_growth(period, true),
            Command::Unload => self.unload(),
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        if let Some(ticket) = self.scheduler.on_tick(now) {
            self.fetch_stats(ticket);
        }
    }

    pub fn on_visibility_change(&mut self, visible: bool, now: Instant) {
        if let Some(ticket) = self.scheduler.on_visibility_change(visible, now) {
            tracing::debug!("Page visible again, catching up");
            self.fetch_stats(ticket);
        }
    }

    pub fn trigger_manual_refresh(&mut self, now: Instant) {
        if let Some(ticket) = self.scheduler.trigger_manual_refresh(now) {
            self.fetch_stats(ticket);
        }
    }

    /// Issue the request for `ticket`; the response comes back as a
    /// [`FetchReport`] through the controller's channel.
    fn fetch_stats(&mut self, ticket: FetchTicket) {
        tracing::debug!("Fetching stats #{} ({:?})", ticket.seq, ticket.trigger);
        self.doc
            .set_disabled(&self.config.selectors.refresh_button, true);

        let source = self.source.clone();
        let tx = self.reports_tx.clone();
        self.track(tokio::spawn(async move {
            let result = source.refresh_stats().await;
            let _ = tx
                .send(FetchReport::Stats {
                    seq: ticket.seq,
                    result,
                })
                .await;
        }));
    }

    fn load_growth(&mut self, period: String, manual: bool) {
        if self.config.growth_chart.is_none() {
            tracing::debug!("No growth chart configured, ignoring period {}", period);
            return;
        }
        self.growth_seq += 1;
        let seq = self.growth_seq;
        let source = self.source.clone();
        let tx = self.reports_tx.clone();
        self.track(tokio::spawn(async move {
            let result = source.user_growth(&period).await;
            let _ = tx
                .send(FetchReport::Growth {
                    seq,
                    period,
                    manual,
                    result,
                })
                .await;
        }));
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|h| !h.is_finished());
        self.tasks.push(handle);
    }

    pub fn apply_report(&mut self, report: FetchReport, now: Instant) {
        match report {
            FetchReport::Stats { seq, result } => {
                let result = result.and_then(|stats| self.check_fields(stats));
                let completion = self.scheduler.complete(seq, result.is_ok(), now);
                if self.scheduler.state() != RefreshState::InFlight {
                    self.doc
                        .set_disabled(&self.config.selectors.refresh_button, false);
                }
                match (completion, result) {
                    (Completion::Apply, Ok(stats)) => self.apply_stats(&stats, now),
                    (Completion::Fail, Err(e)) => {
                        tracing::error!("Dashboard {} refresh failed: {}", self.config.name, e);
                        self.notify(e.user_message(REFRESH_FAILED), Severity::Error, None, now);
                    }
                    _ => tracing::debug!("Dropped stale stats response #{}", seq),
                }
            }
            FetchReport::Growth { seq, period, .. } if seq < self.growth_seq => {
                tracing::debug!("Dropped growth data for {}, a newer period was chosen", period);
            }
            FetchReport::Growth {
                period,
                manual,
                result,
                ..
            } => match result {
                Ok(points) => {
                    let applied = self.apply_growth(&points);
                    tracing::debug!("Growth data for {}: {} points", period, points.len());
                    if applied && manual {
                        self.notify("Chart updated successfully", Severity::Success, None, now);
                    }
                }
                Err(e) => {
                    tracing::error!("Growth data for {} failed: {}", period, e);
                    self.notify(e.user_message(GROWTH_FAILED), Severity::Error, None, now);
                }
            },
        }
    }

    /// A payload missing any configured field is malformed as a whole.
    fn check_fields(&self, stats: DashboardStats) -> Result<DashboardStats, FetchError> {
        let expected = self
            .config
            .stats
            .iter()
            .map(|b| b.key.as_str())
            .chain(self.config.charts.iter().flat_map(|c| c.fields.iter().map(String::as_str)));
        for key in expected {
            if stats.get(key).is_none() {
                return Err(FetchError::Malformed(format!("missing field {}", key)));
            }
        }
        Ok(stats)
    }

    fn apply_stats(&mut self, stats: &DashboardStats, now: Instant) {
        let updates = self.stat_updates(stats);
        let changed = self.patcher.patch(self.doc.as_ref(), &updates, now);

        for index in 0..self.charts.len() {
            let id = self.charts[index].id().to_string();
            if let Some(series) = self.series_from_stats(&id, stats) {
                self.charts[index].update(series);
            }
        }

        let stamp = format_clock(&chrono::Local::now());
        self.doc.set_text(&self.config.selectors.last_updated, &stamp);
        tracing::info!(
            "Dashboard {} refreshed, {} stats changed",
            self.config.name,
            changed
        );
    }

    fn apply_growth(&mut self, points: &[GrowthPoint]) -> bool {
        let Some(id) = self.config.growth_chart.clone() else {
            return false;
        };
        let series = growth_series(points);
        let doc = self.doc.clone();
        match self.charts.iter_mut().find(|c| c.id() == id) {
            Some(chart) if chart.is_rendered() => chart.update(series),
            Some(chart) => chart.render(doc.as_ref(), series),
            None => {
                tracing::warn!("Growth chart {} is not configured as a chart", id);
                false
            }
        }
    }

    fn stat_updates(&self, stats: &DashboardStats) -> Vec<StatUpdate> {
        self.config
            .stats
            .iter()
            .filter_map(|binding| {
                let value = display_value(binding, stats.get(&binding.key)?, self.config.locale)?;
                Some(StatUpdate {
                    selector: binding.selector.clone(),
                    value,
                    animate: binding.animate && binding.format == StatFormat::Count,
                })
            })
            .collect()
    }

    fn series_from_stats(&self, chart_id: &str, stats: &DashboardStats) -> Option<ChartSeries> {
        let binding = self.config.charts.iter().find(|c| c.id == chart_id)?;
        if binding.fields.is_empty() {
            return None;
        }
        let values = binding
            .fields
            .iter()
            .map(|f| stats.get(f).and_then(StatValue::as_f64))
            .collect::<Option<Vec<f64>>>()?;
        let labels = if binding.labels.len() == values.len() {
            binding.labels.clone()
        } else {
            binding.fields.clone()
        };
        Some(ChartSeries::new(labels, values))
    }

    pub fn toggle_sidebar(&mut self, now: Instant) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        let selectors = &self.config.selectors;
        self.doc
            .toggle_class(&selectors.sidebar, "collapsed", self.sidebar_collapsed);
        self.doc
            .toggle_class(&selectors.main_content, "expanded", self.sidebar_collapsed);
        for chart in &mut self.charts {
            chart.request_resize(now);
        }
    }

    pub fn toggle_theme(&mut self, now: Instant) {
        self.dark_theme = !self.dark_theme;
        self.doc
            .toggle_class(&self.config.selectors.body, "dark-theme", self.dark_theme);
        if let Err(e) = self
            .preferences
            .set(&self.config.theme_key, &self.dark_theme.to_string())
        {
            tracing::warn!("Could not persist theme preference: {}", e);
        }
        let name = if self.dark_theme { "dark" } else { "light" };
        self.notify(
            format!("Switched to {} theme", name),
            Severity::Success,
            Some(THEME_TOAST),
            now,
        );
    }

    pub fn notify(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
        now: Instant,
    ) -> Option<NotificationId> {
        self.notifications
            .notify(self.doc.as_ref(), message, severity, duration, now)
    }

    /// Apply every time-based transition due at `now`.
    pub fn advance(&mut self, now: Instant) {
        self.patcher.advance(self.doc.as_ref(), now);
        self.notifications.advance(self.doc.as_ref(), now);
        for chart in &mut self.charts {
            chart.flush_resize(now);
        }
        if let Some(seq) = self.scheduler.expire_in_flight(now) {
            tracing::error!("Stats request #{} timed out", seq);
            self.doc
                .set_disabled(&self.config.selectors.refresh_button, false);
            self.notify(
                FetchError::TimedOut.user_message(REFRESH_FAILED),
                Severity::Error,
                None,
                now,
            );
        }
    }

    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        [
            self.patcher.next_deadline(now),
            self.notifications.next_deadline(),
            self.scheduler.in_flight_deadline(),
        ]
        .into_iter()
        .chain(self.charts.iter().map(ChartAdapter::resize_due))
        .flatten()
        .min()
    }

    /// Page teardown: nothing may fire against the document afterwards.
    pub fn unload(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.scheduler.stop();
        for chart in &mut self.charts {
            chart.destroy();
        }
        self.notifications.clear(self.doc.as_ref());
        self.patcher.clear();
        tracing::info!("Dashboard {} unloaded", self.config.name);
    }
}
