/// CLI configuration
use anyhow::{bail, Context};
use cadence_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix (`CADENCE_OUTPUT__VOLUME=0.5`)
pub const ENV_PREFIX: &str = "CADENCE";

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub state: StateSettings,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Directories making up the catalogue; none means no library access
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    #[serde(default)]
    pub follow_links: bool,
}

/// Accepts either `[state] path = "..."` or a bare `state = "..."`, so
/// `CADENCE_STATE` works as well as `CADENCE_STATE__PATH`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "StateSource")]
pub struct StateSettings {
    /// JSON file holding the persisted playlist, cursor and repeat mode
    pub path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StateSource {
    Path(PathBuf),
    Table {
        #[serde(default = "default_state_path")]
        path: PathBuf,
    },
}

impl From<StateSource> for StateSettings {
    fn from(source: StateSource) -> Self {
        match source {
            StateSource::Path(path) | StateSource::Table { path } => Self { path },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Simulated hardware volume (0.0 = muted)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".cadence").join("state.json")
}

fn default_volume() -> f32 {
    1.0
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadence.toml` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(path, environment())
    }

    pub(crate) fn load_with(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> anyhow::Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with CADENCE_)
        settings = settings.add_source(environment);

        let config = settings.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.output.volume) {
            bail!(
                "output.volume must be between 0.0 and 1.0, got {}",
                self.output.volume
            );
        }

        let trim = &self.engine.silence_trim;
        if trim.min_trailing_secs < 0.0 || trim.reflection_secs < 0.0 {
            bail!("engine.silence_trim durations must not be negative");
        }
        if trim.reflection_secs > trim.min_trailing_secs {
            bail!("engine.silence_trim.reflection_secs must not exceed min_trailing_secs");
        }

        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("library.roots")
        .try_parsing(true)
}
