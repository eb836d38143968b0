//! Setup Wizard - console entry point
//!
//! Drives the standard page set from a terminal. Pages and the button bar
//! go to stdout, logs to stderr.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use setupwizard::cli::{Cli, Commands, RunArgs};
use setupwizard::config::{ProbeConfig, WizardConfig, DEFAULT_CAPTIVE_PORTAL_SERVER};
use setupwizard::console::{ConsoleAuthenticator, ConsoleCommand, ConsoleShell, FilePlatform};
use setupwizard::pages::{standard_registry, PageDeps};
use setupwizard::scheduler::ThreadScheduler;
use setupwizard::subflow::account::{Authenticator, NoAuthenticator};
use setupwizard::subflow::probe::HttpProber;
use setupwizard::subflow::ExternalResult;
use setupwizard::wizard::{SavedState, Wizard};

/// How long the loop waits for input before pumping the navigation queue again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    info!("Setup wizard starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Some(Commands::Run(args)) => run_wizard(args),
        Some(Commands::Probe { server, timeout_ms }) => run_probe(server, timeout_ms),
        Some(Commands::Inspect { file }) => inspect_state(&file),
        None => run_wizard(RunArgs::default()),
    }
}

fn load_config(args: &RunArgs) -> Result<WizardConfig> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            WizardConfig::load_from_file(path)?
        }
        None => WizardConfig::default(),
    };

    let mut config = config.apply_env()?;
    if args.guest {
        config.guest_user = true;
    }
    if args.state.is_some() {
        config.state_file = args.state.clone();
    }
    Ok(config)
}

fn run_wizard(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let platform = Arc::new(FilePlatform::open(&args.settings)?);

    let probe_config = ProbeConfig::resolve(&config, platform.as_ref());
    info!("Captive portal probe URL: {}", probe_config.url);

    let authenticator: Arc<dyn Authenticator> = if args.with_account {
        Arc::new(ConsoleAuthenticator)
    } else {
        Arc::new(NoAuthenticator)
    };
    let deps = PageDeps {
        platform: platform.clone(),
        prober: Arc::new(HttpProber::new(probe_config)),
        authenticator,
    };

    let mut wizard = Wizard::new(
        standard_registry(&deps)?,
        Box::new(ConsoleShell::stdout()),
        platform,
        Arc::new(ThreadScheduler::new()),
    )
    .with_guest_user(config.guest_user);

    let state_file = config.state_file.as_deref();
    wizard.resume_or_start(state_file);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let lines = spawn_stdin_reader()?;
    if !wizard.is_finished() {
        println!("Type h for help.");
    }

    loop {
        wizard.pump();
        if wizard.is_finished() {
            clear_state(state_file);
            break;
        }
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, saving state");
            save_state(&wizard, state_file)?;
            wizard.teardown();
            break;
        }

        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match line.parse::<ConsoleCommand>() {
                Ok(command) => {
                    if !apply_command(&mut wizard, command, state_file)? {
                        break;
                    }
                }
                Err(e) => eprintln!("{} (h for help)", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed, saving state");
                save_state(&wizard, state_file)?;
                wizard.teardown();
                break;
            }
        }
    }

    Ok(())
}

/// Returns false when the loop should stop.
fn apply_command(wizard: &mut Wizard, command: ConsoleCommand, state_file: Option<&Path>) -> Result<bool> {
    debug!("Console command: {:?}", command);
    match command {
        ConsoleCommand::Next => wizard.on_next_page(),
        ConsoleCommand::Previous => wizard.on_previous_page(),
        ConsoleCommand::Back => wizard.on_back_pressed(),
        ConsoleCommand::Result { request, status } => {
            wizard.on_external_result(ExternalResult::new(request, status));
        }
        ConsoleCommand::Toggle { .. } => {
            if let Some(input) = command.page_input() {
                wizard.on_input(input);
            }
        }
        ConsoleCommand::Save => save_state(wizard, state_file)?,
        ConsoleCommand::Quit => {
            save_state(wizard, state_file)?;
            wizard.teardown();
            return Ok(false);
        }
        ConsoleCommand::Help => println!("{}", ConsoleCommand::HELP),
    }
    Ok(true)
}

fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn input reader")?;
    Ok(rx)
}

fn save_state(wizard: &Wizard, state_file: Option<&Path>) -> Result<()> {
    let Some(path) = state_file else {
        warn!("No state file configured, not saving");
        return Ok(());
    };
    wizard.save()?.save_to_file(path)?;
    info!("Wizard state saved to {:?}", path);
    Ok(())
}

fn clear_state(state_file: Option<&Path>) {
    if let Some(path) = state_file.filter(|path| path.exists()) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed state file {:?}", path),
            Err(e) => warn!("Failed to remove state file {:?}: {}", path, e),
        }
    }
}

fn run_probe(server: Option<String>, timeout_ms: Option<u64>) -> Result<()> {
    let config = WizardConfig::default().apply_env()?;
    let server = server
        .or(config.captive_portal_server)
        .unwrap_or_else(|| DEFAULT_CAPTIVE_PORTAL_SERVER.to_string());
    let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.probe_timeout_ms));

    let prober = HttpProber::new(ProbeConfig::for_server(&server, timeout));
    match prober.probe_strict() {
        Ok(verdict) => println!("{}: {}", prober.config().url, verdict),
        Err(e) => println!("{}: {} (not captive)", prober.config().url, e),
    }
    Ok(())
}

fn inspect_state(file: &Path) -> Result<()> {
    let saved = SavedState::load_from_file(file)?;
    let snapshot = saved
        .snapshot()
        .with_context(|| format!("{:?} has a malformed wizard entry", file))?;

    println!("cursor: {}", snapshot.cursor);
    for (key, record) in &snapshot.pages {
        let extra = record
            .extra
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<16} {:<10} {}",
            key,
            if record.completed { "completed" } else { "pending" },
            extra
        );
    }
    Ok(())
}
