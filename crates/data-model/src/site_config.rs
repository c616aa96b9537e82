// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::{Utf8Path, Utf8PathBuf};
use url::Url;

/// Which kind of asset references get rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Assets are served unbundled by the Vite dev server
    Development,

    /// Assets are served from the fingerprinted build output
    Production,
}

impl Mode {
    /// Derive the mode from the value of the `ENV` signal.
    ///
    /// Only `production` selects the production mode. Anything else, including
    /// an unset signal, selects the development mode.
    #[must_use]
    pub fn from_env_signal(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Returns `true` if this is the development mode
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns `true` if this is the production mode
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// What to do when the manifest references an output file which is not on
/// disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFilePolicy {
    /// Log a warning and skip the reference
    #[default]
    Warn,

    /// Fail the render
    Error,
}

/// Resolved assets configuration, shared by everything rendering asset
/// references.
///
/// This is built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AssetsSettings {
    /// The directory against which relative paths were resolved
    pub base_path: Utf8PathBuf,

    /// The directory containing the Vite build output
    pub assets_path: Utf8PathBuf,

    /// The path to the Vite manifest
    pub manifest_path: Utf8PathBuf,

    /// The origin of the Vite dev server, e.g. `http://localhost:5173/`
    pub dev_server_origin: Url,

    /// The URL prefix under which the build output is served, e.g. `/static`
    pub static_url_prefix: String,

    /// Whether to render references for the dev server or the build output
    pub mode: Mode,

    /// How to handle output files missing from the assets directory
    pub missing_files: MissingFilePolicy,
}

impl AssetsSettings {
    /// Build the URL of a source file served by the dev server
    #[must_use]
    pub fn dev_server_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.dev_server_origin.as_str().trim_end_matches('/'),
            path.trim_start_matches('/'),
        )
    }

    /// Build the public URL of a file of the build output
    #[must_use]
    pub fn static_url(&self, file: &str) -> String {
        format!(
            "{}/{}",
            self.static_url_prefix.trim_end_matches('/'),
            file.trim_start_matches('/'),
        )
    }

    /// The location on disk of a file of the build output
    #[must_use]
    pub fn output_file_path(&self, file: &Utf8Path) -> Utf8PathBuf {
        self.assets_path.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(origin: &str, prefix: &str) -> AssetsSettings {
        AssetsSettings {
            base_path: Utf8PathBuf::from("/app"),
            assets_path: Utf8PathBuf::from("/app/dist"),
            manifest_path: Utf8PathBuf::from("/app/dist/.vite/manifest.json"),
            dev_server_origin: origin.parse().unwrap(),
            static_url_prefix: prefix.to_owned(),
            mode: Mode::Production,
            missing_files: MissingFilePolicy::Warn,
        }
    }

    #[test]
    fn test_mode_from_env_signal() {
        assert_eq!(Mode::from_env_signal(None), Mode::Development);
        assert_eq!(Mode::from_env_signal(Some("development")), Mode::Development);
        assert_eq!(Mode::from_env_signal(Some("staging")), Mode::Development);
        assert_eq!(Mode::from_env_signal(Some("Production")), Mode::Development);
        assert_eq!(Mode::from_env_signal(Some("production")), Mode::Production);
    }

    #[test]
    fn test_dev_server_url() {
        let settings = settings("http://localhost:5173", "/static");
        assert_eq!(
            settings.dev_server_url("src/main.ts"),
            "http://localhost:5173/src/main.ts"
        );
        assert_eq!(
            settings.dev_server_url("/@vite/client"),
            "http://localhost:5173/@vite/client"
        );
    }

    #[test]
    fn test_static_url() {
        let with_slash = settings("http://localhost:5173", "/static/");
        assert_eq!(
            with_slash.static_url("assets/main-abc123.js"),
            "/static/assets/main-abc123.js"
        );

        let cdn = settings("http://localhost:5173", "https://cdn.example.com/app");
        assert_eq!(
            cdn.static_url("assets/main-abc123.js"),
            "https://cdn.example.com/app/assets/main-abc123.js"
        );

        let empty = settings("http://localhost:5173", "");
        assert_eq!(empty.static_url("main.js"), "/main.js");
    }

    #[test]
    fn test_output_file_path() {
        let settings = settings("http://localhost:5173", "/static");
        assert_eq!(
            settings.output_file_path(Utf8Path::new("assets/main-abc123.js")),
            Utf8PathBuf::from("/app/dist/assets/main-abc123.js")
        );
    }
}
