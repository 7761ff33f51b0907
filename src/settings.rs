use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::GatehouseError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub gates: Gates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gates {
    /// If false no policies are loaded and every request passes.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Directory holding the `*.kdl` policy files. Default: policies
    pub policies_dir: PathBuf,
    /// Refuse to start when a policy references an unregistered gate.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Include error details in 500 responses produced by the gates.
    #[serde(default)]
    pub expose_errors: bool,
    /// Bearer token the `admin` gate accepts.
    pub admin_token: Option<String>,
    /// Rule inspection API port (defaults to port + 1)
    pub inspect_port: Option<u16>,
}

fn default_enabled() -> bool {
    true
}

fn default_strict() -> bool {
    true
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            policies_dir: PathBuf::from("policies"),
            strict: default_strict(),
            expose_errors: false,
            admin_token: None,
            inspect_port: None, // Defaults to port + 1 if not set
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, GatehouseError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)?
            .set_default("server.port", Server::default().port)?
            .set_default(
                "gates.policies_dir",
                Gates::default().policies_dir.to_string_lossy().to_string(),
            )?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: GATEHOUSE__SERVER__PORT=9090, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("GATEHOUSE").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        // Normalize policies path to be relative to current dir
        if s.gates.policies_dir.is_relative() {
            s.gates.policies_dir = std::env::current_dir()?.join(&s.gates.policies_dir);
        }

        Ok(s)
    }

    pub fn inspect_port(&self) -> u16 {
        self.gates
            .inspect_port
            .unwrap_or(self.server.port.saturating_add(1))
    }
}
