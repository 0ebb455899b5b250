use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use chrono::FixedOffset;
use chrono::Offset;
use chrono::Utc;
use docpeek_query::CompileOptions;
use docpeek_query::DatePolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const HOME_ENV: &str = "DOCPEEK_HOME";

const DEFAULT_HISTORY_ENTRIES: usize = 10;
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 24;

/// Settings read from `config.toml` in the docpeek home directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Editor command line; the file to edit is appended as the last
    /// argument.
    pub editor: Option<String>,
    pub query: QueryConfig,
    pub history: HistoryConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Offset such as `+02:00` applied to dates typed without a zone.
    pub naive_utc_offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_HISTORY_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl Config {
    /// Reads `config.toml` from `home`; a missing file yields defaults.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILENAME);
        match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn compile_options(&self) -> Result<CompileOptions> {
        let dates = match self.query.naive_utc_offset.as_deref() {
            Some(raw) => DatePolicy::with_offset(parse_offset(raw)?),
            None => DatePolicy::default(),
        };
        Ok(CompileOptions { dates })
    }
}

fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|err| anyhow!("invalid naive_utc_offset {raw:?}: {err}"))
}

/// `$DOCPEEK_HOME` when set, otherwise `~/.docpeek`.
pub fn find_docpeek_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    let mut home = dirs::home_dir().ok_or_else(|| anyhow!("Could not locate home directory"))?;
    home.push(".docpeek");
    Ok(home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let home = TempDir::new().expect("tempdir");
        let config = Config::load(home.path()).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.history.max_entries, 10);
        assert_eq!((config.view.width, config.view.height), (80, 24));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().expect("tempdir");
        fs::write(
            home.path().join(CONFIG_FILENAME),
            "editor = \"nano -w\"\n[query]\nnaive_utc_offset = \"+02:00\"\n[view]\nwidth = 100\n",
        )
        .expect("write");
        let config = Config::load(home.path()).expect("load");
        assert_eq!(config.editor.as_deref(), Some("nano -w"));
        assert_eq!(config.view.width, 100);
        assert_eq!(config.view.height, 24);
        assert_eq!(config.history.max_entries, 10);

        let options = config.compile_options().expect("options");
        assert_eq!(
            options.dates.naive_offset,
            FixedOffset::east_opt(7200).expect("offset")
        );
    }

    #[test]
    fn bad_values_are_reported() {
        let home = TempDir::new().expect("tempdir");
        fs::write(home.path().join(CONFIG_FILENAME), "[view]\nwidth = \"wide\"\n").expect("write");
        assert!(Config::load(home.path()).is_err());

        let config = Config {
            query: QueryConfig {
                naive_utc_offset: Some("two hours".to_string()),
            },
            ..Config::default()
        };
        assert_matches!(config.compile_options(), Err(_));
    }

    #[test]
    fn utc_aliases() {
        assert_eq!(
            parse_offset("UTC").expect("offset"),
            FixedOffset::east_opt(0).expect("offset")
        );
    }
}
