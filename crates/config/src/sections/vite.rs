// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::num::ParseIntError;

use camino::{Utf8Path, Utf8PathBuf};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use thiserror::Error;
use url::Url;
use vite_assets_data_model::{AssetsSettings, MissingFilePolicy, Mode};

use super::ConfigurationSection;

/// Port the Vite dev server listens on by default
const DEFAULT_DEV_SERVER_PORT: u16 = 5173;

fn default_assets_path() -> Utf8PathBuf {
    "dist".into()
}

fn is_default_assets_path(value: &Utf8Path) -> bool {
    value == default_assets_path()
}

fn default_dev_server_url() -> Url {
    Url::parse("http://localhost:5173/").unwrap()
}

fn is_default_dev_server_url(value: &Url) -> bool {
    *value == default_dev_server_url()
}

fn default_static_url_prefix() -> String {
    "/static".to_owned()
}

fn is_default_static_url_prefix(value: &str) -> bool {
    value == default_static_url_prefix()
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_true(value: &bool) -> bool {
    *value
}

fn manifest_path_example() -> &'static str {
    "web/dist/.vite/manifest.json"
}

/// Which kind of asset references to render
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViteMode {
    /// Reference the sources served by the Vite dev server
    Development,

    /// Reference the files of the production build
    Production,
}

impl From<ViteMode> for Mode {
    fn from(value: ViteMode) -> Self {
        match value {
            ViteMode::Development => Self::Development,
            ViteMode::Production => Self::Production,
        }
    }
}

/// What to do when the manifest references a file missing from the assets
/// directory
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MissingFilesPolicy {
    /// Log a warning and leave the reference out of the page
    #[default]
    Warn,

    /// Fail rendering the page
    Error,
}

impl From<MissingFilesPolicy> for MissingFilePolicy {
    fn from(value: MissingFilesPolicy) -> Self {
        match value {
            MissingFilesPolicy::Warn => Self::Warn,
            MissingFilesPolicy::Error => Self::Error,
        }
    }
}

/// Configuration of the Vite integration
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ViteConfig {
    /// Directory against which the relative paths below are resolved.
    ///
    /// Defaults to the working directory of the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub base_path: Option<Utf8PathBuf>,

    /// Directory containing the Vite build output. Defaults to `dist`.
    #[serde(
        default = "default_assets_path",
        skip_serializing_if = "is_default_assets_path"
    )]
    #[schemars(with = "String")]
    pub assets_path: Utf8PathBuf,

    /// Path to the Vite manifest.
    ///
    /// Defaults to `.vite/manifest.json` inside of the assets directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>", example = "manifest_path_example")]
    pub manifest_path: Option<Utf8PathBuf>,

    /// Origin of the Vite dev server. Defaults to `http://localhost:5173/`.
    ///
    /// The `VITE_HOST` and `VITE_PORT` environment variables take precedence.
    #[serde(
        default = "default_dev_server_url",
        skip_serializing_if = "is_default_dev_server_url"
    )]
    pub dev_server_url: Url,

    /// URL prefix under which the build output is served. Defaults to
    /// `/static`.
    #[serde(
        default = "default_static_url_prefix",
        skip_serializing_if = "is_default_static_url_prefix"
    )]
    pub static_url_prefix: String,

    /// Whether to pick the mode from the `ENV` environment variable when no
    /// mode is set. `ENV=production` selects the production mode, anything
    /// else the development mode. When disabled, the production mode is used.
    #[serde(default = "default_true", skip_serializing_if = "is_default_true")]
    pub auto_detect_mode: bool,

    /// Force a mode, regardless of the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ViteMode>,

    /// What to do when the manifest references files which are missing from
    /// the assets directory. Defaults to `warn`.
    #[serde(default)]
    pub missing_files: MissingFilesPolicy,
}

impl Default for ViteConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            assets_path: default_assets_path(),
            manifest_path: None,
            dev_server_url: default_dev_server_url(),
            static_url_prefix: default_static_url_prefix(),
            auto_detect_mode: true,
            mode: None,
            missing_files: MissingFilesPolicy::default(),
        }
    }
}

impl ConfigurationSection for ViteConfig {
    const PATH: Option<&'static str> = Some("vite");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata(Self::PATH.unwrap());
        let annotate = |mut error: figment::Error, field: &'static str| {
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![Self::PATH.unwrap().to_owned(), field.to_owned()];
            error
        };

        if !matches!(self.dev_server_url.scheme(), "http" | "https") {
            return Err(annotate(
                figment::Error::custom("the dev server URL must use http or https"),
                "dev_server_url",
            )
            .into());
        }

        if self.dev_server_url.path() != "/" || self.dev_server_url.query().is_some() {
            return Err(annotate(
                figment::Error::custom("the dev server URL must be an origin, without a path"),
                "dev_server_url",
            )
            .into());
        }

        let prefix = self.static_url_prefix.as_str();
        if !prefix.is_empty()
            && !prefix.starts_with('/')
            && !prefix.starts_with("http://")
            && !prefix.starts_with("https://")
        {
            return Err(annotate(
                figment::Error::custom(
                    "the static URL prefix must be an absolute path or an absolute URL",
                ),
                "static_url_prefix",
            )
            .into());
        }

        Ok(())
    }
}

/// The environment variables which influence the Vite integration, read once
/// at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    /// The `ENV` variable
    pub env: Option<String>,

    /// The `VITE_HOST` variable
    pub vite_host: Option<String>,

    /// The `VITE_PORT` variable
    pub vite_port: Option<String>,

    /// The working directory of the process, if it is valid UTF-8
    pub current_dir: Option<Utf8PathBuf>,
}

impl EnvironmentSignals {
    /// Capture the signals from the environment of the current process
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            env: std::env::var("ENV").ok(),
            vite_host: std::env::var("VITE_HOST").ok(),
            vite_port: std::env::var("VITE_PORT").ok(),
            current_dir: std::env::current_dir()
                .ok()
                .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok()),
        }
    }
}

/// Failed to turn the Vite configuration into [`AssetsSettings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// `VITE_PORT` is not a port number
    #[error("invalid VITE_PORT {value:?}")]
    InvalidPort {
        /// The value of the variable
        value: String,

        /// The underlying error
        #[source]
        source: ParseIntError,
    },

    /// `VITE_HOST` does not make a valid URL
    #[error("invalid VITE_HOST {value:?}")]
    InvalidHost {
        /// The value of the variable
        value: String,

        /// The underlying error
        #[source]
        source: url::ParseError,
    },

    /// The configured dev server URL cannot carry a port
    #[error("cannot set the port of the dev server URL {url}")]
    CannotSetPort {
        /// The configured URL
        url: Url,
    },
}

impl ViteConfig {
    /// Resolve the paths and the mode of this configuration against the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the `VITE_HOST` or `VITE_PORT` variables are invalid
    pub fn settings(&self, signals: &EnvironmentSignals) -> Result<AssetsSettings, SettingsError> {
        let current_dir = signals
            .current_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        let base_path = match &self.base_path {
            Some(base_path) => current_dir.join(base_path),
            None => current_dir,
        };

        let assets_path = base_path.join(&self.assets_path);
        let manifest_path = match &self.manifest_path {
            Some(manifest_path) => base_path.join(manifest_path),
            None => assets_path.join(Utf8Path::new(".vite/manifest.json")),
        };

        let mode = match (self.mode, self.auto_detect_mode) {
            (Some(mode), _) => mode.into(),
            (None, true) => Mode::from_env_signal(signals.env.as_deref()),
            (None, false) => Mode::Production,
        };

        Ok(AssetsSettings {
            base_path,
            assets_path,
            manifest_path,
            dev_server_origin: self.dev_server_origin(signals)?,
            static_url_prefix: self.static_url_prefix.trim_end_matches('/').to_owned(),
            mode,
            missing_files: self.missing_files.into(),
        })
    }

    fn dev_server_origin(&self, signals: &EnvironmentSignals) -> Result<Url, SettingsError> {
        let port = signals
            .vite_port
            .as_deref()
            .map(|value| {
                value
                    .parse::<u16>()
                    .map_err(|source| SettingsError::InvalidPort {
                        value: value.to_owned(),
                        source,
                    })
            })
            .transpose()?;

        if let Some(host) = signals.vite_host.as_deref() {
            let port = port.unwrap_or(DEFAULT_DEV_SERVER_PORT);
            return Url::parse(&format!("http://{host}:{port}/")).map_err(|source| {
                SettingsError::InvalidHost {
                    value: host.to_owned(),
                    source,
                }
            });
        }

        let mut origin = self.dev_server_url.clone();
        if let Some(port) = port {
            origin
                .set_port(Some(port))
                .map_err(|()| SettingsError::CannotSetPort {
                    url: self.dev_server_url.clone(),
                })?;
        }

        Ok(origin)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };

    use super::*;

    fn signals() -> EnvironmentSignals {
        EnvironmentSignals {
            current_dir: Some("/app".into()),
            ..EnvironmentSignals::default()
        }
    }

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    vite:
                      assets_path: web/dist
                      manifest_path: web/dist/.vite/manifest.json
                      dev_server_url: http://localhost:3000
                      static_url_prefix: /assets
                      base_path: /srv/app
                      mode: production
                      missing_files: error
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = ViteConfig::extract(&figment).unwrap();

            assert_eq!(config.assets_path, "web/dist");
            assert_eq!(
                config.manifest_path.as_deref(),
                Some(Utf8Path::new("web/dist/.vite/manifest.json"))
            );
            assert_eq!(config.dev_server_url.as_str(), "http://localhost:3000/");
            assert_eq!(config.static_url_prefix, "/assets");
            assert_eq!(config.base_path.as_deref(), Some(Utf8Path::new("/srv/app")));
            assert_eq!(config.mode, Some(ViteMode::Production));
            assert_eq!(config.missing_files, MissingFilesPolicy::Error);

            Ok(())
        });
    }

    #[test]
    fn load_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "vite: {}")?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = ViteConfig::extract(&figment).unwrap();

            assert_eq!(config.assets_path, "dist");
            assert!(config.manifest_path.is_none());
            assert_eq!(config.dev_server_url.as_str(), "http://localhost:5173/");
            assert_eq!(config.static_url_prefix, "/static");
            assert!(config.auto_detect_mode);
            assert!(config.mode.is_none());
            assert!(config.base_path.is_none());
            assert_eq!(config.missing_files, MissingFilesPolicy::Warn);

            Ok(())
        });
    }

    #[test]
    fn reject_invalid_values() {
        Jail::expect_with(|jail| {
            for section in [
                "vite:\n  dev_server_url: ftp://localhost:5173",
                "vite:\n  dev_server_url: http://localhost:5173/app/",
                "vite:\n  static_url_prefix: static",
                "vite:\n  missing_files: ignore",
                "vite:\n  mode: staging",
            ] {
                jail.create_file("config.yaml", section)?;
                let figment = Figment::new().merge(Yaml::file("config.yaml"));
                assert!(ViteConfig::extract(&figment).is_err(), "{section}");
            }

            Ok(())
        });
    }

    #[test]
    fn validation_error_points_at_field() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "vite:\n  static_url_prefix: static")?;
            let figment = Figment::new().merge(Yaml::file("config.yaml"));

            let error = ViteConfig::extract(&figment).unwrap_err();
            let error = error.downcast::<figment::Error>().unwrap();
            assert_eq!(error.path, vec!["vite", "static_url_prefix"]);

            Ok(())
        });
    }

    #[test]
    fn settings_defaults() {
        let settings = ViteConfig::default().settings(&signals()).unwrap();

        assert_eq!(settings.base_path, "/app");
        assert_eq!(settings.assets_path, "/app/dist");
        assert_eq!(settings.manifest_path, "/app/dist/.vite/manifest.json");
        assert_eq!(settings.dev_server_origin.as_str(), "http://localhost:5173/");
        assert_eq!(settings.static_url_prefix, "/static");
        assert_eq!(settings.mode, Mode::Development);
        assert_eq!(settings.missing_files, MissingFilePolicy::Warn);
    }

    #[test]
    fn settings_paths() {
        let config = ViteConfig {
            assets_path: "web/dist".into(),
            base_path: Some("/srv/app".into()),
            static_url_prefix: "/assets/".to_owned(),
            ..ViteConfig::default()
        };
        let settings = config.settings(&signals()).unwrap();
        assert_eq!(settings.base_path, "/srv/app");
        assert_eq!(settings.assets_path, "/srv/app/web/dist");
        assert_eq!(settings.manifest_path, "/srv/app/web/dist/.vite/manifest.json");
        assert_eq!(settings.static_url_prefix, "/assets");

        let config = ViteConfig {
            manifest_path: Some("build/manifest.json".into()),
            base_path: Some("frontend".into()),
            ..ViteConfig::default()
        };
        let settings = config.settings(&signals()).unwrap();
        assert_eq!(settings.base_path, "/app/frontend");
        assert_eq!(settings.manifest_path, "/app/frontend/build/manifest.json");
    }

    #[test]
    fn settings_mode() {
        let production = EnvironmentSignals {
            env: Some("production".to_owned()),
            ..signals()
        };
        let staging = EnvironmentSignals {
            env: Some("staging".to_owned()),
            ..signals()
        };

        let config = ViteConfig::default();
        assert_eq!(config.settings(&signals()).unwrap().mode, Mode::Development);
        assert_eq!(config.settings(&production).unwrap().mode, Mode::Production);
        assert_eq!(config.settings(&staging).unwrap().mode, Mode::Development);

        let forced = ViteConfig {
            mode: Some(ViteMode::Development),
            ..ViteConfig::default()
        };
        assert_eq!(forced.settings(&production).unwrap().mode, Mode::Development);

        let forced = ViteConfig {
            mode: Some(ViteMode::Production),
            ..ViteConfig::default()
        };
        assert_eq!(forced.settings(&signals()).unwrap().mode, Mode::Production);

        let no_detection = ViteConfig {
            auto_detect_mode: false,
            ..ViteConfig::default()
        };
        assert_eq!(
            no_detection.settings(&signals()).unwrap().mode,
            Mode::Production
        );
    }

    #[test]
    fn settings_dev_server_origin() {
        let config = ViteConfig {
            dev_server_url: "http://localhost:3000".parse().unwrap(),
            ..ViteConfig::default()
        };
        let settings = config.settings(&signals()).unwrap();
        assert_eq!(settings.dev_server_origin.as_str(), "http://localhost:3000/");

        let signals_with_host = EnvironmentSignals {
            vite_host: Some("0.0.0.0".to_owned()),
            vite_port: Some("8080".to_owned()),
            ..signals()
        };
        let settings = config.settings(&signals_with_host).unwrap();
        assert_eq!(settings.dev_server_origin.as_str(), "http://0.0.0.0:8080/");

        let signals_with_host = EnvironmentSignals {
            vite_host: Some("vite".to_owned()),
            ..signals()
        };
        let settings = config.settings(&signals_with_host).unwrap();
        assert_eq!(settings.dev_server_origin.as_str(), "http://vite:5173/");

        let signals_with_port = EnvironmentSignals {
            vite_port: Some("4000".to_owned()),
            ..signals()
        };
        let settings = config.settings(&signals_with_port).unwrap();
        assert_eq!(settings.dev_server_origin.as_str(), "http://localhost:4000/");
    }

    #[test]
    fn settings_invalid_signals() {
        let config = ViteConfig::default();

        let bad_port = EnvironmentSignals {
            vite_port: Some("eighty".to_owned()),
            ..signals()
        };
        assert_matches!(
            config.settings(&bad_port),
            Err(SettingsError::InvalidPort { value, .. }) if value == "eighty"
        );

        let bad_host = EnvironmentSignals {
            vite_host: Some("exa mple".to_owned()),
            ..signals()
        };
        assert_matches!(
            config.settings(&bad_host),
            Err(SettingsError::InvalidHost { .. })
        );
    }

    #[test]
    fn signals_from_process() {
        Jail::expect_with(|jail| {
            jail.set_env("ENV", "production");
            jail.set_env("VITE_HOST", "0.0.0.0");

            let signals = EnvironmentSignals::from_process();
            assert_eq!(signals.env.as_deref(), Some("production"));
            assert_eq!(signals.vite_host.as_deref(), Some("0.0.0.0"));
            assert!(signals.current_dir.is_some());

            Ok(())
        });
    }
}
