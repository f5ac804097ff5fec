use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::rate_limit::PacingMode;

/// Default listener port when neither `PORT` nor the config file sets one.
pub const DEFAULT_PORT: u16 = 5000;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub server: Option<ServerConfig>,
    pub timeouts: Option<TimeoutsConfig>,
    pub pacing: Option<PacingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub lookup_secs: Option<u64>,
    pub detail_secs: Option<u64>,
    pub document_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub detail_delay_ms: Option<u64>,
    pub mode: Option<PacingMode>,
}

/// Platform config directory path: `<config_dir>/lireg/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lireg").join("config.toml"))
}

/// Load config by cascading CWD `.lireg.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".lireg.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_server = base.server.unwrap_or_default();
    let over_server = overlay.server.unwrap_or_default();
    let base_timeouts = base.timeouts.unwrap_or_default();
    let over_timeouts = overlay.timeouts.unwrap_or_default();
    let base_pacing = base.pacing.unwrap_or_default();
    let over_pacing = overlay.pacing.unwrap_or_default();

    ConfigFile {
        server: Some(ServerConfig {
            port: over_server.port.or(base_server.port),
        }),
        timeouts: Some(TimeoutsConfig {
            lookup_secs: over_timeouts.lookup_secs.or(base_timeouts.lookup_secs),
            detail_secs: over_timeouts.detail_secs.or(base_timeouts.detail_secs),
            document_secs: over_timeouts.document_secs.or(base_timeouts.document_secs),
        }),
        pacing: Some(PacingConfig {
            detail_delay_ms: over_pacing.detail_delay_ms.or(base_pacing.detail_delay_ms),
            mode: over_pacing.mode.or(base_pacing.mode),
        }),
    }
}

impl ConfigFile {
    /// Apply the file's values over `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(t) = &self.timeouts {
            if let Some(v) = t.lookup_secs {
                config.lookup_timeout_secs = v;
            }
            if let Some(v) = t.detail_secs {
                config.detail_timeout_secs = v;
            }
            if let Some(v) = t.document_secs {
                config.document_timeout_secs = Some(v);
            }
        }
        if let Some(p) = &self.pacing {
            if let Some(v) = p.detail_delay_ms {
                config.detail_delay_ms = v;
            }
            if let Some(mode) = p.mode {
                config.pacing = mode;
            }
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().and_then(|s| s.port)
    }
}

/// Apply `LIREG_*` environment overrides. `var` looks up a variable by name.
///
/// Unparsable values are ignored.
pub fn apply_env(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    let parse = |name: &str| var(name).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(v) = parse("LIREG_LOOKUP_TIMEOUT") {
        config.lookup_timeout_secs = v;
    }
    if let Some(v) = parse("LIREG_DETAIL_TIMEOUT") {
        config.detail_timeout_secs = v;
    }
    if let Some(v) = parse("LIREG_DOCUMENT_TIMEOUT") {
        config.document_timeout_secs = Some(v);
    }
    if let Some(v) = parse("LIREG_DETAIL_DELAY_MS") {
        config.detail_delay_ms = v;
    }
}

/// Resolve the listener port: `PORT` env > config file > [`DEFAULT_PORT`].
pub fn resolve_port(file: &ConfigFile, var: impl Fn(&str) -> Option<String>) -> u16 {
    var("PORT")
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| file.port())
        .unwrap_or(DEFAULT_PORT)
}

/// Default config, overlaid with the config files and then the environment.
pub fn resolve_config(file: &ConfigFile) -> Config {
    let mut config = Config::default();
    file.apply(&mut config);
    apply_env(&mut config, |name| std::env::var(name).ok());
    config
}
