//! Captive-portal probe
//!
//! Issues a single `GET http://<server>/generate_204` without following
//! redirects or using caches. A real internet path answers `204 No Content`;
//! anything else means something in between intercepted the request.
//!
//! # Failure Mode
//!
//! Any transport failure (DNS, refused, timeout) yields
//! [`ProbeVerdict::Unreachable`], which counts as *not captive*: the wizard
//! lets the user move on rather than trapping them behind a probe.

use std::fmt;

use crate::config::ProbeConfig;
use crate::error::WizardError;

/// Outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Got a 204 with no body
    Open,
    /// Got something other than an empty 204
    Captive { status: u16 },
    /// Probe failed at the transport level
    Unreachable,
}

impl ProbeVerdict {
    /// Verdict for a received HTTP response.
    pub fn from_response(status: u16, content_length: Option<u64>) -> Self {
        let has_body = content_length.is_some_and(|len| len > 0);
        if status != 204 || has_body {
            Self::Captive { status }
        } else {
            Self::Open
        }
    }

    pub fn is_captive(self) -> bool {
        matches!(self, Self::Captive { .. })
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Captive { status } => write!(f, "Captive (HTTP {})", status),
            Self::Unreachable => write!(f, "Unreachable (treated as open)"),
        }
    }
}

/// Something that can decide whether the current network is captive.
///
/// Runs on worker threads only.
pub trait Prober: Send + Sync {
    fn probe(&self) -> ProbeVerdict;
}

/// Probe over plain HTTP using a blocking ureq agent.
pub struct HttpProber {
    config: ProbeConfig,
    agent: ureq::Agent,
}

impl HttpProber {
    pub fn new(config: ProbeConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .redirects(0)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe, keeping transport failures as errors for callers that want them.
    pub fn probe_strict(&self) -> Result<ProbeVerdict, WizardError> {
        let response = self
            .agent
            .get(&self.config.url)
            .set("Cache-Control", "no-cache")
            .set("Pragma", "no-cache")
            .call();

        match response {
            Ok(resp) => {
                let content_length = resp
                    .header("Content-Length")
                    .and_then(|v| v.trim().parse::<u64>().ok());
                Ok(ProbeVerdict::from_response(resp.status(), content_length))
            }
            // 4xx/5xx still came from somebody: not the open internet
            Err(ureq::Error::Status(status, _)) => Ok(ProbeVerdict::Captive { status }),
            Err(ureq::Error::Transport(transport)) => {
                Err(WizardError::transient_network(transport.to_string()))
            }
        }
    }
}

impl Prober for HttpProber {
    fn probe(&self) -> ProbeVerdict {
        match self.probe_strict() {
            Ok(verdict) => {
                tracing::info!("Captive portal check against {}: {}", self.config.url, verdict);
                verdict
            }
            Err(e) => {
                tracing::warn!("Captive portal check - probably not a portal: {}", e);
                ProbeVerdict::Unreachable
            }
        }
    }
}
