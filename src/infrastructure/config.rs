use crate::domain::chart::ChartKind;
use crate::domain::format::Locale;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub otp: OtpSettings,
}

/// Everything one dashboard page needs: where to poll, what to patch, which
/// charts to feed. One config replaces the per-role copies of the same script.
#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_refresh_interval", deserialize_with = "millis")]
    pub refresh_interval: Duration,
    #[serde(default = "default_request_timeout", deserialize_with = "millis")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_theme_key")]
    pub theme_key: String,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub stats: Vec<StatBinding>,
    #[serde(default)]
    pub charts: Vec<ChartBinding>,
    #[serde(default)]
    pub growth_chart: Option<String>,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Selectors {
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_body")]
    pub toast_container: String,
    #[serde(default = "default_sidebar")]
    pub sidebar: String,
    #[serde(default = "default_main_content")]
    pub main_content: String,
    #[serde(default = "default_refresh_button")]
    pub refresh_button: String,
    #[serde(default = "default_last_updated")]
    pub last_updated: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatFormat {
    /// Plain integer, animated as a counter.
    #[default]
    Count,
    /// Integer with thousands separators.
    Number,
    /// Locale currency string.
    Currency,
    /// Shown verbatim.
    Text,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StatBinding {
    pub key: String,
    pub selector: String,
    #[serde(default)]
    pub format: StatFormat,
    #[serde(default = "default_true")]
    pub animate: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChartBinding {
    pub id: String,
    pub canvas: String,
    pub kind: ChartKind,
    /// Labels for a series built from stat fields.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Stat keys whose values make up the series on each refresh.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NotificationSettings {
    #[serde(default = "default_info", deserialize_with = "millis")]
    pub info: Duration,
    #[serde(default = "default_success", deserialize_with = "millis")]
    pub success: Duration,
    #[serde(default = "default_warning", deserialize_with = "millis")]
    pub warning: Duration,
    #[serde(default = "default_error", deserialize_with = "millis")]
    pub error: Duration,
    #[serde(default = "default_fade", deserialize_with = "millis")]
    pub fade: Duration,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnimationSettings {
    #[serde(default = "default_counter", deserialize_with = "millis")]
    pub counter: Duration,
    #[serde(default = "default_highlight", deserialize_with = "millis")]
    pub highlight: Duration,
    #[serde(default = "default_frame", deserialize_with = "millis")]
    pub frame: Duration,
    #[serde(default = "default_resize_debounce", deserialize_with = "millis")]
    pub resize_debounce: Duration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpSettings {
    #[serde(default = "default_otp_cell_prefix")]
    pub cell_prefix: String,
    #[serde(default = "default_otp_hidden")]
    pub hidden_input: String,
    #[serde(default = "default_otp_submit")]
    pub submit_button: String,
    #[serde(default = "default_otp_resend")]
    pub resend_button: String,
    #[serde(default = "default_otp_countdown")]
    pub countdown: String,
    #[serde(default = "default_otp_resend_countdown")]
    pub resend_countdown: String,
    #[serde(default = "default_body")]
    pub toast_container: String,
    #[serde(default = "default_otp_restart_path")]
    pub restart_path: String,
    #[serde(default = "default_otp_remaining", deserialize_with = "secs")]
    pub default_remaining: Duration,
    #[serde(default = "default_otp_resend_cooldown", deserialize_with = "secs")]
    pub resend_cooldown: Duration,
    #[serde(default = "default_otp_auto_submit", deserialize_with = "millis")]
    pub auto_submit_delay: Duration,
    #[serde(default = "default_otp_redirect", deserialize_with = "millis")]
    pub redirect_delay: Duration,
    #[serde(default = "default_otp_notice", deserialize_with = "millis")]
    pub notice: Duration,
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

fn default_true() -> bool {
    true
}
fn default_refresh_interval() -> Duration {
    Duration::from_secs(30)
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_theme_key() -> String {
    "baristaDarkTheme".to_string()
}
fn default_body() -> String {
    "body".to_string()
}
fn default_sidebar() -> String {
    ".sidebar".to_string()
}
fn default_main_content() -> String {
    ".main-content".to_string()
}
fn default_refresh_button() -> String {
    ".refresh-btn".to_string()
}
fn default_last_updated() -> String {
    "#lastUpdated".to_string()
}
fn default_info() -> Duration {
    Duration::from_secs(3)
}
fn default_success() -> Duration {
    Duration::from_secs(3)
}
fn default_warning() -> Duration {
    Duration::from_secs(5)
}
fn default_error() -> Duration {
    Duration::from_secs(6)
}
fn default_fade() -> Duration {
    Duration::from_millis(300)
}
fn default_counter() -> Duration {
    Duration::from_millis(1000)
}
fn default_highlight() -> Duration {
    Duration::from_millis(500)
}
fn default_frame() -> Duration {
    Duration::from_millis(50)
}
fn default_resize_debounce() -> Duration {
    Duration::from_millis(300)
}
fn default_otp_cell_prefix() -> String {
    "#otp-".to_string()
}
fn default_otp_hidden() -> String {
    "#otpCode".to_string()
}
fn default_otp_submit() -> String {
    "#submitButton".to_string()
}
fn default_otp_resend() -> String {
    "#resendBtn".to_string()
}
fn default_otp_countdown() -> String {
    "#countdownTime".to_string()
}
fn default_otp_resend_countdown() -> String {
    "#resendCountdown".to_string()
}
fn default_otp_restart_path() -> String {
    "/forgot-password".to_string()
}
fn default_otp_remaining() -> Duration {
    Duration::from_secs(600)
}
fn default_otp_resend_cooldown() -> Duration {
    Duration::from_secs(60)
}
fn default_otp_auto_submit() -> Duration {
    Duration::from_millis(500)
}
fn default_otp_redirect() -> Duration {
    Duration::from_millis(3000)
}
fn default_otp_notice() -> Duration {
    Duration::from_millis(4000)
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            body: default_body(),
            toast_container: default_body(),
            sidebar: default_sidebar(),
            main_content: default_main_content(),
            refresh_button: default_refresh_button(),
            last_updated: default_last_updated(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            info: default_info(),
            success: default_success(),
            warning: default_warning(),
            error: default_error(),
            fade: default_fade(),
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            counter: default_counter(),
            highlight: default_highlight(),
            frame: default_frame(),
            resize_debounce: default_resize_debounce(),
        }
    }
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            cell_prefix: default_otp_cell_prefix(),
            hidden_input: default_otp_hidden(),
            submit_button: default_otp_submit(),
            resend_button: default_otp_resend(),
            countdown: default_otp_countdown(),
            resend_countdown: default_otp_resend_countdown(),
            toast_container: default_body(),
            restart_path: default_otp_restart_path(),
            default_remaining: default_otp_remaining(),
            resend_cooldown: default_otp_resend_cooldown(),
            auto_submit_delay: default_otp_auto_submit(),
            redirect_delay: default_otp_redirect(),
            notice: default_otp_notice(),
        }
    }
}

impl OtpSettings {
    pub fn cell_selector(&self, index: usize) -> String {
        format!("{}{}", self.cell_prefix, index)
    }
}

impl DashboardConfig {
    /// A config with every optional field at its default.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            refresh_interval: default_refresh_interval(),
            request_timeout: default_request_timeout(),
            locale: Locale::default(),
            theme_key: default_theme_key(),
            selectors: Selectors::default(),
            stats: Vec::new(),
            charts: Vec::new(),
            growth_chart: None,
            notifications: NotificationSettings::default(),
            animation: AnimationSettings::default(),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_stat(mut self, key: &str, selector: &str, format: StatFormat) -> Self {
        self.stats.push(StatBinding {
            key: key.to_string(),
            selector: selector.to_string(),
            format,
            animate: format == StatFormat::Count,
        });
        self
    }

    pub fn with_chart(mut self, chart: ChartBinding) -> Self {
        self.charts.push(chart);
        self
    }

    pub fn with_growth_chart(mut self, chart_id: &str) -> Self {
        self.growth_chart = Some(chart_id.to_string());
        self
    }

    /// Timer periods the run loop cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.refresh_interval.is_zero(),
            "dashboard {}: refresh_interval must be greater than zero",
            self.name
        );
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "dashboard {}: request_timeout must be greater than zero",
            self.name
        );
        anyhow::ensure!(
            !self.animation.frame.is_zero(),
            "dashboard {}: animation frame must be greater than zero",
            self.name
        );
        Ok(())
    }
}

/// Load `<path>` (any format the `config` crate recognises by extension) and
/// apply `CAFE_DASHBOARD__SECTION__KEY` environment overrides.
pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(
            config::Environment::with_prefix("CAFE_DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.dashboard.validate()?;
    Ok(config)
}
