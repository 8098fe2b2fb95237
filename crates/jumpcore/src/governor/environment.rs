use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SignalWeights;

pub const HOSTNAME_ENV_VAR: &str = "JUMPLAB_HOSTNAME";
pub const PROTOCOL_ENV_VAR: &str = "JUMPLAB_PROTOCOL";
pub const DEBUG_ENV_VAR: &str = "JUMPLAB_DEBUG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Development,
    Production,
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

/// Host hints used to pick default diagnostic verbosity. `None` means the
/// signal could not be checked and does not vote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    pub hostname: Option<String>,
    pub protocol: Option<String>,
    pub debug_flag: Option<bool>,
    pub debug_console: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvironmentClassification {
    pub kind: EnvironmentKind,
    pub production_weight: f32,
    pub checked_weight: f32,
}

impl EnvironmentSignals {
    /// An unset debug variable counts as "no debug flag"; debug builds count
    /// as having a debug console.
    pub fn from_env() -> Self {
        Self {
            hostname: read_env_trimmed(HOSTNAME_ENV_VAR),
            protocol: read_env_trimmed(PROTOCOL_ENV_VAR),
            debug_flag: match read_env_trimmed(DEBUG_ENV_VAR) {
                None => Some(false),
                Some(value) => {
                    let parsed = parse_flag(&value);
                    if parsed.is_none() {
                        warn!(
                            env_var = DEBUG_ENV_VAR,
                            value = value.as_str(),
                            "invalid debug flag value; signal ignored"
                        );
                    }
                    parsed
                }
            },
            debug_console: Some(cfg!(debug_assertions)),
        }
    }

    pub fn classify(&self, weights: SignalWeights) -> EnvironmentClassification {
        let mut production_weight = 0.0f32;
        let mut checked_weight = 0.0f32;

        let mut vote = |weight: f32, production: Option<bool>| {
            if let Some(production) = production {
                checked_weight += weight;
                if production {
                    production_weight += weight;
                }
            }
        };

        vote(
            weights.hostname,
            self.hostname.as_deref().map(|host| !is_local_host(host)),
        );
        vote(
            weights.protocol,
            self.protocol
                .as_deref()
                .map(|protocol| normalize_protocol(protocol) == "https"),
        );
        vote(weights.debug_flag, self.debug_flag.map(|flag| !flag));
        vote(
            weights.debug_console,
            self.debug_console.map(|available| !available),
        );

        let kind = if checked_weight > 0.0 && production_weight * 2.0 > checked_weight {
            EnvironmentKind::Production
        } else {
            EnvironmentKind::Development
        };

        EnvironmentClassification {
            kind,
            production_weight,
            checked_weight,
        }
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    host.is_empty()
        || host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host == "0.0.0.0"
        || host == "::1"
        || host == "[::1]"
        || host.starts_with("127.")
}

fn normalize_protocol(protocol: &str) -> String {
    protocol.trim().trim_end_matches(':').to_ascii_lowercase()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_trimmed(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = var, error = %error, "unable to read environment signal");
            None
        }
    }
}
