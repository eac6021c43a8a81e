use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub sources: Option<SourcesConfig>,
    pub network: Option<NetworkConfig>,
    pub parsing: Option<ParsingSection>,
    pub pdf: Option<PdfConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub openalex_key: Option<String>,
    pub mailto: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub disabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub timeout_secs: Option<u64>,
    pub link_timeout_secs: Option<u64>,
    pub max_concurrent_refs: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingSection {
    pub dictionary_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Fraction of page height treated as header band (0 disables).
    pub header_exclusion: Option<f32>,
    pub footer_exclusion: Option<f32>,
}

/// Field-wise merge where values set in `overlay` win.
trait Overlay: Sized {
    fn overlay(self, top: Self) -> Self;
}

fn merge_section<T: Overlay>(base: Option<T>, overlay: Option<T>) -> Option<T> {
    match (base, overlay) {
        (Some(b), Some(o)) => Some(b.overlay(o)),
        (b, o) => o.or(b),
    }
}

impl Overlay for ApiKeysConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            openalex_key: top.openalex_key.or(self.openalex_key),
            mailto: top.mailto.or(self.mailto),
        }
    }
}

impl Overlay for SourcesConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            disabled: top.disabled.or(self.disabled),
        }
    }
}

impl Overlay for NetworkConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            timeout_secs: top.timeout_secs.or(self.timeout_secs),
            link_timeout_secs: top.link_timeout_secs.or(self.link_timeout_secs),
            max_concurrent_refs: top.max_concurrent_refs.or(self.max_concurrent_refs),
        }
    }
}

impl Overlay for ParsingSection {
    fn overlay(self, top: Self) -> Self {
        Self {
            dictionary_path: top.dictionary_path.or(self.dictionary_path),
        }
    }
}

impl Overlay for PdfConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            header_exclusion: top.header_exclusion.or(self.header_exclusion),
            footer_exclusion: top.footer_exclusion.or(self.footer_exclusion),
        }
    }
}

/// Platform config directory path: `<config_dir>/refcheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("refcheck").join("config.toml"))
}

/// Load config by cascading CWD `.refcheck.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".refcheck.toml"));

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
    match load_required(path) {
        Ok(config) => Some(config),
        Err(ConfigError::Read { .. }) => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring config file");
            None
        }
    }
}

/// Load a config the user asked for explicitly; missing or invalid files are errors.
pub fn load_required(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api_keys: merge_section(base.api_keys, overlay.api_keys),
        sources: merge_section(base.sources, overlay.sources),
        network: merge_section(base.network, overlay.network),
        parsing: merge_section(base.parsing, overlay.parsing),
        pdf: merge_section(base.pdf, overlay.pdf),
    }
}

impl ConfigFile {
    /// Apply the file's settings on top of `config`.
    pub fn apply_to(&self, config: &mut crate::Config) {
        if let Some(keys) = &self.api_keys {
            if keys.openalex_key.is_some() {
                config.openalex_key = keys.openalex_key.clone();
            }
            if keys.mailto.is_some() {
                config.mailto = keys.mailto.clone();
            }
        }
        if let Some(disabled) = self.sources.as_ref().and_then(|s| s.disabled.clone()) {
            config.disabled_sources = disabled;
        }
        if let Some(net) = &self.network {
            if let Some(t) = net.timeout_secs {
                config.search_timeout_secs = t;
            }
            if let Some(t) = net.link_timeout_secs {
                config.link_timeout_secs = t;
            }
            if let Some(n) = net.max_concurrent_refs {
                config.max_concurrent_refs = n.max(1);
            }
        }
    }

    pub fn dictionary_path(&self) -> Option<PathBuf> {
        self.parsing
            .as_ref()
            .and_then(|p| p.dictionary_path.as_ref())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_deserializes() {
        let parsed: ConfigFile =
            toml::from_str("[network]\ntimeout_secs = 3\n[sources]\ndisabled = [\"arXiv\"]\n")
                .unwrap();
        assert_eq!(parsed.network.unwrap().timeout_secs, Some(3));
        assert_eq!(parsed.sources.unwrap().disabled, Some(vec!["arXiv".to_string()]));
        assert!(parsed.api_keys.is_none());
    }

    #[test]
    fn merge_overlay_wins_field_by_field() {
        let base = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                openalex_key: Some("base-key".into()),
                mailto: Some("base@example.org".into()),
            }),
            network: Some(NetworkConfig {
                timeout_secs: Some(30),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                mailto: Some("me@example.org".into()),
                ..Default::default()
            }),
            pdf: Some(PdfConfig {
                header_exclusion: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let keys = merged.api_keys.unwrap();
        assert_eq!(keys.openalex_key.as_deref(), Some("base-key"));
        assert_eq!(keys.mailto.as_deref(), Some("me@example.org"));
        assert_eq!(merged.network.unwrap().timeout_secs, Some(30));
        assert_eq!(merged.pdf.unwrap().header_exclusion, Some(0.0));
    }

    #[test]
    fn load_from_path_missing_or_invalid_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("absent.toml")).is_none());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "network = [[[").unwrap();
        assert!(load_from_path(&bad).is_none());
        assert!(matches!(load_required(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_required_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parsing]\ndictionary_path = \"/tmp/words\"").unwrap();
        let config = load_required(file.path()).unwrap();
        assert_eq!(config.dictionary_path(), Some(PathBuf::from("/tmp/words")));
    }

    #[test]
    fn apply_to_overrides_runtime_config() {
        let file = ConfigFile {
            sources: Some(SourcesConfig {
                disabled: Some(vec!["arXiv".into()]),
            }),
            network: Some(NetworkConfig {
                timeout_secs: Some(4),
                link_timeout_secs: None,
                max_concurrent_refs: Some(0),
            }),
            ..Default::default()
        };
        let mut config = crate::Config::default();
        file.apply_to(&mut config);
        assert_eq!(config.disabled_sources, vec!["arXiv".to_string()]);
        assert_eq!(config.search_timeout_secs, 4);
        assert_eq!(config.link_timeout_secs, 10);
        assert_eq!(config.max_concurrent_refs, 1);
    }
}
