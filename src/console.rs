//! Line-oriented terminal host
//!
//! Renders pages and the button bar as plain text and takes one command per
//! line. External sub-flows are not run for real: the console announces them
//! and the operator types the result back in with `r <request> <status>`.

use anyhow::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{Result, WizardError};
use crate::host::{ButtonBar, ButtonTheme, HostShell, Platform};
use crate::page::{res, PageBody, PageInput, PageView, ResourceId};
use crate::scheduler::FinishHandle;
use crate::subflow::account::{AccountOptions, Authenticator, AuthenticatorResponse};
use crate::subflow::{ExternalIntent, RequestId, ResultStatus};

/// Intent action for the console's pretend authenticator.
pub const ACTION_ADD_ACCOUNT: &str = "setupwizard.action.ADD_ACCOUNT";

/// English text for a resource handle.
pub fn label(id: ResourceId) -> &'static str {
    match id {
        res::NEXT => "Next",
        res::SKIP => "Skip",
        res::START => "Start",
        res::LOADING => "Just a sec...",
        res::WELCOME => "Welcome",
        res::DATE_TIME => "Date & time",
        res::SETUP_OTHER => "Other settings",
        res::FINISH => "All set",
        res::BACKUP => "Back up my data",
        res::LOCATION => "Allow location access",
        res::GPS => "Use GPS",
        res::NETWORK_LOCATION => "Use network location",
        _ => id.0,
    }
}

/// Host shell writing to a terminal (or any writer).
pub struct ConsoleShell<W: Write> {
    out: W,
    chrome_enabled: bool,
}

impl ConsoleShell<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleShell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            chrome_enabled: true,
        }
    }

    pub fn chrome_enabled(&self) -> bool {
        self.chrome_enabled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            tracing::warn!("Console write failed: {}", e);
        }
    }
}

impl<W: Write> HostShell for ConsoleShell<W> {
    fn start_external_flow(&mut self, intent: &ExternalIntent, request: RequestId) -> Result<()> {
        self.emit(format_args!(
            "  -> {} ({})\n     reply with: r {} ok|first|cancel|<code>\n",
            request.name(),
            intent.action,
            request.0
        ));
        Ok(())
    }

    fn show_page(&mut self, view: PageView) {
        let mut text = format!("\n== {} ==\n", label(view.title));
        match &view.body {
            PageBody::Loading => text.push_str(&format!("  {}\n", label(res::LOADING))),
            PageBody::Text(id) if *id != view.title => {
                text.push_str(&format!("  {}\n", label(*id)));
            }
            PageBody::Text(_) => {}
            PageBody::Toggles(toggles) => {
                for toggle in toggles {
                    text.push_str(&format!(
                        "  [{}] {} ({}){}\n",
                        if toggle.checked { "x" } else { " " },
                        label(toggle.label),
                        toggle.name,
                        if toggle.enabled { "" } else { " - unavailable" }
                    ));
                }
            }
        }
        self.emit(format_args!("{}", text));
    }

    fn set_button_bar(&mut self, bar: ButtonBar) {
        let prev = match (bar.prev_visible, bar.prev_label) {
            (false, _) => String::new(),
            (true, Some(id)) => format!("[p] < {}", label(id)),
            (true, None) if bar.prev_chevron => "[p] <".to_string(),
            (true, None) => String::new(),
        };
        let next = match bar.theme {
            ButtonTheme::Final => format!("[n] {} >>", label(bar.next_label)),
            ButtonTheme::Standard => format!("[n] {} >", label(bar.next_label)),
        };
        self.emit(format_args!("  {:<16}{}\n", prev, next));
    }

    fn animate_finish(&mut self, done: FinishHandle) {
        self.emit(format_args!("\n*** Setup complete ***\n"));
        done.complete();
    }

    fn enable_chrome(&mut self, enabled: bool) {
        self.chrome_enabled = enabled;
    }
}

/// Platform backed by a JSON settings file. Broadcasts are logged.
#[derive(Debug)]
pub struct FilePlatform {
    path: PathBuf,
    settings: Mutex<BTreeMap<String, String>>,
    broadcasts: Mutex<Vec<String>>,
}

impl FilePlatform {
    /// Open (or start) a settings file. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            serde_json::from_str(&content).context("Failed to parse settings JSON")?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            settings: Mutex::new(settings),
            broadcasts: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

impl Platform for FilePlatform {
    fn get_setting(&self, name: &str) -> Option<String> {
        self.settings.lock().ok()?.get(name).cloned()
    }

    fn put_setting(&self, name: &str, value: &str) -> Result<()> {
        let mut settings = self
            .settings
            .lock()
            .map_err(|e| WizardError::general(format!("settings lock poisoned: {}", e)))?;
        settings.insert(name.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(&self.path, json)?;
        tracing::debug!("Setting {}={} written to {:?}", name, value, self.path);
        Ok(())
    }

    fn send_broadcast(&self, name: &str) -> Result<()> {
        tracing::info!("Broadcast: {}", name);
        self.broadcasts
            .lock()
            .map_err(|e| WizardError::general(format!("broadcast lock poisoned: {}", e)))?
            .push(name.to_string());
        Ok(())
    }
}

/// Stand-in authenticator: always available, hands back an add-account
/// intent, and trusts the operator's result.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAuthenticator;

impl Authenticator for ConsoleAuthenticator {
    fn is_available(&self) -> bool {
        true
    }

    fn add_account(&self, options: AccountOptions) -> Result<AuthenticatorResponse> {
        let intent = ExternalIntent::new(ACTION_ADD_ACCOUNT)
            .with_extra("firstRun", options.first_run.to_string())
            .with_extra("allowSkip", options.allow_skip.to_string())
            .with_extra("useImmersive", options.use_immersive.to_string());
        Ok(AuthenticatorResponse::Intent(intent))
    }

    fn account_exists(&self) -> bool {
        true
    }
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Next,
    Previous,
    Back,
    Result { request: RequestId, status: ResultStatus },
    Toggle { name: String, enabled: bool },
    Save,
    Quit,
    Help,
}

impl ConsoleCommand {
    pub const HELP: &'static str = "\
commands:
  n                       next / skip
  p                       previous
  b                       back key
  r <request> <status>    deliver a sub-flow result (status: ok, first, cancel or a code)
  t <toggle> on|off       flip a toggle on the current page
  s                       save state
  q                       save state and quit
  h                       this help";
}

impl FromStr for ConsoleCommand {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            ["n" | "next"] => Ok(Self::Next),
            ["p" | "prev" | "previous"] => Ok(Self::Previous),
            ["b" | "back"] => Ok(Self::Back),
            ["s" | "save"] => Ok(Self::Save),
            ["q" | "quit"] => Ok(Self::Quit),
            ["h" | "help" | "?"] => Ok(Self::Help),
            ["r" | "result", request, status] => {
                let request = request
                    .parse::<u32>()
                    .map(RequestId)
                    .map_err(|_| WizardError::general(format!("Bad request id: {}", request)))?;
                Ok(Self::Result {
                    request,
                    status: status.parse()?,
                })
            }
            ["t" | "toggle", name, state] => {
                let enabled = match *state {
                    "on" | "1" | "true" => true,
                    "off" | "0" | "false" => false,
                    other => {
                        return Err(WizardError::general(format!("Expected on|off, got {}", other)));
                    }
                };
                Ok(Self::Toggle {
                    name: name.to_string(),
                    enabled,
                })
            }
            _ => Err(WizardError::general(format!("Unknown command: {:?}", s.trim()))),
        }
    }
}

impl ConsoleCommand {
    /// Input for the current page, if this command carries one.
    pub fn page_input(&self) -> Option<PageInput> {
        match self {
            Self::Toggle { name, enabled } => Some(PageInput::Toggle {
                name: name.clone(),
                enabled: *enabled,
            }),
            _ => None,
        }
    }
}
