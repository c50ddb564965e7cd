// Main entry point - wires page controllers to the console
use anyhow::Context;
use cafe_dashboard::application::document::Document;
use cafe_dashboard::application::live_update::{Command, DashboardController, dashboard_actions};
use cafe_dashboard::application::otp_controller::OtpController;
use cafe_dashboard::application::preference_store::PreferenceStore;
use cafe_dashboard::application::reset_form::ResetForm;
use cafe_dashboard::infrastructure::config::load_config;
use cafe_dashboard::infrastructure::http_stats_source::HttpStatsSource;
use cafe_dashboard::infrastructure::memory_document::MemoryDocument;
use cafe_dashboard::infrastructure::page_data::{PageData, load_page_data};
use cafe_dashboard::infrastructure::preferences::{FilePreferenceStore, MemoryPreferenceStore};
use cafe_dashboard::infrastructure::text_chart::TextChartBackend;
use cafe_dashboard::presentation::console::{
    ConsoleLine, DASHBOARD_HELP, OTP_HELP, RESET_HELP, ResetInput, dashboard_document,
    describe_effect, otp_document, parse_dashboard_line, parse_otp_line, parse_reset_line,
    reset_document,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(
    name = "cafe-dashboard",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live dashboards and OTP entry for the cafe back office, driven from the console"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a dashboard endpoint and patch the page as stats change
    Dashboard {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE", default_value = "config/dashboard.toml")]
        config: String,

        /// Server-rendered page data (JSON)
        #[arg(long, value_name = "FILE")]
        page: Option<PathBuf>,

        /// Where the theme preference is kept; in memory if omitted
        #[arg(long, value_name = "FILE")]
        prefs: Option<PathBuf>,
    },

    /// Enter a verification code against the expiry countdown
    Otp {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE", default_value = "config/dashboard.toml")]
        config: String,

        /// Server-rendered page data (JSON)
        #[arg(long, value_name = "FILE")]
        page: Option<PathBuf>,
    },

    /// Choose a new password, or request a reset link
    Reset {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE", default_value = "config/dashboard.toml")]
        config: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Dashboard {
            config,
            page,
            prefs,
        } => run_dashboard(&config, page.as_deref(), prefs.as_deref()).await,
        Commands::Otp { config, page } => run_otp(&config, page.as_deref()).await,
        Commands::Reset { config } => run_reset(&config).await,
    }
}

fn read_page(path: Option<&Path>) -> anyhow::Result<PageData> {
    match path {
        Some(path) => load_page_data(path),
        None => Ok(PageData::default()),
    }
}

async fn run_dashboard(
    config: &str,
    page: Option<&Path>,
    prefs: Option<&Path>,
) -> anyhow::Result<()> {
    let dashboard = load_config(config)?.dashboard;
    let page = read_page(page)?;

    let doc = dashboard_document(&dashboard, &page);
    let shared: Arc<dyn Document> = Arc::new(doc.clone());
    let source = Arc::new(HttpStatsSource::new(
        &dashboard.endpoint,
        dashboard.request_timeout,
    ));
    let charts = Arc::new(TextChartBackend::new(shared.clone()));
    let preferences: Arc<dyn PreferenceStore> = match prefs {
        Some(path) => Arc::new(
            FilePreferenceStore::open(path)
                .with_context(|| format!("Failed to open preferences {}", path.display()))?,
        ),
        None => Arc::new(MemoryPreferenceStore::default()),
    };

    let mut controller = DashboardController::new(dashboard, shared, source, charts, preferences);
    controller.mount(&page, Instant::now());
    let (commands, rx) = mpsc::channel(16);
    let page_task = tokio::spawn(controller.run(rx));
    let printer = tokio::spawn(print_changes(doc.clone()));

    println!("{}", DASHBOARD_HELP);
    let actions = dashboard_actions();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_dashboard_line(&line) {
            ConsoleLine::Input(event) => match actions.dispatch(&event) {
                Some(command) => {
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                None => eprintln!("ignored: {}", line.trim()),
            },
            ConsoleLine::Quit => break,
            ConsoleLine::Blank => {}
            ConsoleLine::Unknown(text) => eprintln!("unknown command {:?}; {}", text, DASHBOARD_HELP),
        }
    }

    let _ = commands.send(Command::Unload).await;
    page_task.await.context("Dashboard task failed")?;
    printer.abort();
    println!("{}", doc.render());
    Ok(())
}

async fn run_otp(config: &str, page: Option<&Path>) -> anyhow::Result<()> {
    let settings = load_config(config)?.otp;
    let page = read_page(page)?;

    let doc = otp_document(&settings);
    let mut otp = OtpController::new(settings, Arc::new(doc.clone()));
    otp.mount(page.otp.as_ref(), Instant::now());
    let (commands, rx) = mpsc::channel(16);
    let mut page_task = tokio::spawn(otp.run(rx));
    let printer = tokio::spawn(print_changes(doc.clone()));

    println!("{}", OTP_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let effect = loop {
        tokio::select! {
            effect = &mut page_task => break effect.context("OTP task failed")?,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break None;
                };
                match parse_otp_line(&line) {
                    ConsoleLine::Input(batch) => {
                        for command in batch {
                            if commands.send(command).await.is_err() {
                                break;
                            }
                        }
                    }
                    ConsoleLine::Quit => break None,
                    ConsoleLine::Blank => {}
                    ConsoleLine::Unknown(text) => eprintln!("unknown command {:?}; {}", text, OTP_HELP),
                }
            }
            _ = tokio::signal::ctrl_c() => break None,
        }
    };

    page_task.abort();
    printer.abort();
    println!("{}", doc.render());
    match effect {
        Some(effect) => println!("{}", describe_effect(&effect)),
        None => println!("left without submitting"),
    }
    Ok(())
}

async fn run_reset(config: &str) -> anyhow::Result<()> {
    let toast_container = load_config(config)?.dashboard.selectors.toast_container;
    let doc = reset_document(&toast_container);
    let mut form = ResetForm::new(Arc::new(doc.clone()), &toast_container);
    let printer = tokio::spawn(print_changes(doc.clone()));

    println!("{}", RESET_HELP);
    let (mut password, mut confirmation) = (String::new(), String::new());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        let wake = form.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break None;
                };
                match parse_reset_line(&line) {
                    ConsoleLine::Input(ResetInput::Password(text)) => {
                        form.on_input(&text);
                        password = text;
                    }
                    ConsoleLine::Input(ResetInput::Confirm(text)) => confirmation = text,
                    ConsoleLine::Input(ResetInput::Submit) => {
                        if form.submit(&password, &confirmation, Instant::now()).is_some() {
                            break Some("new password accepted".to_string());
                        }
                    }
                    ConsoleLine::Input(ResetInput::Forgot(email)) => {
                        if let Some(email) = form.submit_email(&email, Instant::now()) {
                            break Some(format!("reset link requested for {}", email));
                        }
                    }
                    ConsoleLine::Quit => break None,
                    ConsoleLine::Blank => {}
                    ConsoleLine::Unknown(text) => eprintln!("unknown command {:?}; {}", text, RESET_HELP),
                }
            }
            _ = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                form.advance(Instant::now());
            }
            _ = tokio::signal::ctrl_c() => break None,
        }
    };

    printer.abort();
    println!("{}", doc.render());
    println!("{}", outcome.as_deref().unwrap_or("left without submitting"));
    Ok(())
}

/// Reprint the page whenever it differs from the last frame.
async fn print_changes(doc: MemoryDocument) {
    let mut last = String::new();
    let mut ticker = tokio::time::interval(FRAME);
    loop {
        ticker.tick().await;
        let frame = doc.render();
        if frame != last {
            println!("----\n{}", frame);
            last = frame;
        }
    }
}
