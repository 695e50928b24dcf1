//! Script library for the terminal host.
//!
//! Scripts come from a TOML file or, when none is given, from the built-in
//! set below:
//!
//! ```toml
//! [defaults]
//! glitch_probability = 0.05
//!
//! [[scripts]]
//! name = "hero"
//! typing_speed_ms = 40
//! commands = ["whoami", "[Max]"]
//!
//! [[scripts]]
//! name = "launch"
//! commands = ['./launch --project --purpose="{purpose}"']
//! ```
//!
//! Every numeric setting is optional; unset values fall through from the
//! command line, to the script, to `[defaults]`, to the engine defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use teletype_common::error::{Result, TeletypeError};
use teletype_common::types::TerminalConfig;

/// Placeholder substituted with the `--purpose` text.
pub const PURPOSE_PLACEHOLDER: &str = "{purpose}";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Overrides,
    pub scripts: Vec<Script>,
}

/// Optional terminal settings layered over the engine defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub typing_enabled: Option<bool>,
    pub glitch_probability: Option<f64>,
    pub typing_speed_ms: Option<i64>,
    pub initial_delay_ms: Option<i64>,
    pub glitch_hold_ms: Option<i64>,
    pub glitch_pause_ms: Option<i64>,
    pub command_pause_ms: Option<i64>,
    pub caret_interval_ms: Option<i64>,
}

impl Overrides {
    fn apply(&self, config: &mut TerminalConfig) {
        if let Some(v) = self.typing_enabled {
            config.typing_enabled = v;
        }
        if let Some(v) = self.glitch_probability {
            config.glitch_probability = v;
        }
        if let Some(v) = self.typing_speed_ms {
            config.typing_speed_ms = v;
        }
        if let Some(v) = self.initial_delay_ms {
            config.initial_delay_ms = v;
        }
        if let Some(v) = self.glitch_hold_ms {
            config.glitch_hold_ms = v;
        }
        if let Some(v) = self.glitch_pause_ms {
            config.glitch_pause_ms = v;
        }
        if let Some(v) = self.command_pause_ms {
            config.command_pause_ms = v;
        }
        if let Some(v) = self.caret_interval_ms {
            config.caret_interval_ms = v;
        }
    }
}

/// A named list of commands to type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(flatten)]
    pub overrides: Overrides,
}

impl Script {
    fn builtin(name: &str, commands: &[&str], typing_speed_ms: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            overrides: Overrides {
                typing_speed_ms,
                ..Overrides::default()
            },
        }
    }

    /// Commands with the purpose placeholder filled in
    pub fn render(&self, purpose: &str) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.replace(PURPOSE_PLACEHOLDER, purpose))
            .collect()
    }
}

impl Config {
    /// Load a configuration file. A file without scripts gets the built-in
    /// ones.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TeletypeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| TeletypeError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        if config.scripts.is_empty() {
            config.scripts = Self::builtin_scripts();
        }
        Ok(config)
    }

    /// Built-in configuration
    pub fn builtin() -> Self {
        Self {
            defaults: Overrides::default(),
            scripts: Self::builtin_scripts(),
        }
    }

    fn builtin_scripts() -> Vec<Script> {
        vec![
            Script::builtin(
                "hero",
                &[
                    "whoami",
                    "[Max]",
                    "Job: Building things that (sometimes) work",
                    "Location: [redacted] • ☕ Infinite coffee mode",
                ],
                Some(40),
            ),
            Script::builtin(
                "contact",
                &[
                    "contact --method",
                    "[1] Carrier pigeon (Preferred)",
                    "[2] Email (max@bonhomme.lol)",
                    "[3] Fax (Seriously?)",
                ],
                Some(30),
            ),
            Script::builtin(
                "launch",
                &["./launch --project --purpose=\"{purpose}\""],
                None,
            ),
        ]
    }

    /// Scripts by name, in the order asked for. No names selects all.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Script>> {
        if names.is_empty() {
            return Ok(self.scripts.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.scripts
                    .iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(|| TeletypeError::UnknownScript(name.clone()))
            })
            .collect()
    }

    /// Terminal configuration for `script`, with `cli` taking precedence
    pub fn terminal_config(&self, script: &Script, cli: &Overrides, purpose: &str) -> TerminalConfig {
        let mut config = TerminalConfig::new(script.render(purpose));
        self.defaults.apply(&mut config);
        script.overrides.apply(&mut config);
        cli.apply(&mut config);
        config
    }
}
