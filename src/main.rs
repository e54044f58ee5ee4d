//! kwin-bridge - KWin window state as JSON, once or over WebSocket
//!
//! Without `--ws` the current state is printed to stdout (optionally after
//! running one window action). Logs go to stderr so the JSON stays clean.

use clap::{Args, CommandFactory, Parser, error::ErrorKind};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kwin_bridge::apps::AppCatalog;
use kwin_bridge::backend::create_transport;
use kwin_bridge::commands::Dispatcher;
use kwin_bridge::config::{
    BridgeConfig, DEFAULT_HOST, DEFAULT_INTERVAL_SECS, DEFAULT_PORT, DEFAULT_RESERVED_BOTTOM,
};
use kwin_bridge::input::SystemInput;
use kwin_bridge::relay::{JournalSource, Relay, ScriptAction, TokioSleeper, journal};
use kwin_bridge::server;
use kwin_bridge::snapshot::StateProvider;

#[derive(Parser, Debug)]
#[command(name = "kwin-bridge", version, about = "KWin window/desktop/monitor state as JSON")]
struct Cli {
    /// Only report windows of this process
    #[arg(long)]
    pid: Option<i64>,

    /// Journal unit to read script output from ("auto" probes the KWin units)
    #[arg(long, default_value = "auto")]
    service: String,

    #[command(flatten)]
    action: ActionArgs,

    /// Indented JSON output
    #[arg(long)]
    pretty: bool,

    /// Start the WebSocket server
    #[arg(long)]
    ws: bool,

    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between state polls per client
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: f64,

    /// Verbose logs (same as RUST_LOG=debug)
    #[arg(long)]
    debug: bool,

    /// Space reserved at the bottom of each monitor in client layouts
    #[arg(long, default_value_t = DEFAULT_RESERVED_BOTTOM)]
    reserved_bottom: u32,
}

/// Window actions; at most one per invocation
#[derive(Args, Debug)]
#[group(multiple = false)]
struct ActionArgs {
    /// Maximize window by internalId/windowId
    #[arg(long, value_name = "WINID")]
    maximize: Option<String>,

    /// Minimize window by internalId/windowId
    #[arg(long, value_name = "WINID")]
    minimize: Option<String>,

    /// Restore window (minimized/maximized off)
    #[arg(long, value_name = "WINID")]
    restore: Option<String>,

    #[arg(long, value_name = "WINID")]
    fullscreen: Option<String>,

    #[arg(long, value_name = "WINID")]
    fullscreen_exit: Option<String>,

    /// Toggle "on all desktops"
    #[arg(long, value_name = "WINID")]
    pin_toggle: Option<String>,

    #[arg(long, value_name = "WINID")]
    close: Option<String>,

    /// Activate window
    #[arg(long, value_name = "WINID")]
    active: Option<String>,

    /// Move window to a desktop (number or name)
    #[arg(long, num_args = 2, value_names = ["WINID", "DESKTOP"])]
    move_desktop: Option<Vec<String>>,

    /// Move window to a monitor (number or output name)
    #[arg(long, num_args = 2, value_names = ["WINID", "MONITOR"])]
    move_monitor: Option<Vec<String>>,
}

enum CliAction {
    Script { action: ScriptAction, window_id: String },
    MoveMonitor { window_id: String, monitor: String },
}

impl ActionArgs {
    fn selected(&self) -> Option<CliAction> {
        let simple = [
            (&self.maximize, ScriptAction::Maximize),
            (&self.minimize, ScriptAction::Minimize),
            (&self.restore, ScriptAction::Restore),
            (&self.fullscreen, ScriptAction::Fullscreen),
            (&self.fullscreen_exit, ScriptAction::FullscreenExit),
            (&self.pin_toggle, ScriptAction::PinToggle),
            (&self.close, ScriptAction::Close),
            (&self.active, ScriptAction::Activate),
        ];
        for (window_id, action) in simple {
            if let Some(window_id) = window_id {
                return Some(CliAction::Script {
                    action,
                    window_id: window_id.clone(),
                });
            }
        }
        if let Some([window_id, desktop]) = self.move_desktop.as_deref() {
            return Some(CliAction::Script {
                action: ScriptAction::MoveDesktop(desktop.clone()),
                window_id: window_id.clone(),
            });
        }
        if let Some([window_id, monitor]) = self.move_monitor.as_deref() {
            return Some(CliAction::MoveMonitor {
                window_id: window_id.clone(),
                monitor: monitor.clone(),
            });
        }
        None
    }
}

impl Cli {
    fn config(&self) -> anyhow::Result<BridgeConfig> {
        BridgeConfig {
            host: self.host.clone(),
            port: self.port,
            debug: self.debug,
            service: Some(self.service.clone()),
            pid: self.pid,
            reserved_bottom: self.reserved_bottom,
            ..Default::default()
        }
        .with_interval_secs(self.interval)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    // Initialize tracing (stderr to keep stdout clean for the JSON output)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let action = cli.action.selected();
    if action.is_some() && cli.ws {
        Cli::command()
            .error(ErrorKind::ArgumentConflict, "Actions are not allowed in WS mode.")
            .exit();
    }
    if action.is_some() && cli.pid.is_some() {
        Cli::command()
            .error(
                ErrorKind::ArgumentConflict,
                "When using actions, provide a window id (internalId/windowId), not --pid.",
            )
            .exit();
    }

    let transport = create_transport().await?;
    let relay = Relay::new(transport, Arc::new(JournalSource)).with_retry(config.retry, Arc::new(TokioSleeper));
    let services = journal::resolve_services(config.service.as_deref()).await;
    tracing::debug!("Journal units: {:?}", services);

    let provider = Arc::new(
        StateProvider::new(Arc::new(relay), services, config.build_options(), AppCatalog::from_env())
            .with_pid(config.pid),
    );
    let dispatcher = Arc::new(Dispatcher::new(provider.clone(), Arc::new(SystemInput)));

    if cli.ws {
        let listener = TcpListener::bind(config.bind_address()).await?;
        tokio::select! {
            result = server::serve(listener, dispatcher, config.interval) => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
        }
        return Ok(());
    }

    match action {
        Some(CliAction::Script { action, window_id }) => {
            provider.relay().run_action(&action, Some(window_id.as_str())).await?;
        }
        Some(CliAction::MoveMonitor { window_id, monitor }) => {
            let trace = dispatcher.move_to_monitor(&window_id, &monitor).await?;
            tracing::debug!("{}", trace);
        }
        None => {}
    }

    let snapshot = provider.acquire().await?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");
    Ok(())
}
