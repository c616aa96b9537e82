// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use vite_assets_data_model::{AssetsSettings, MissingFilePolicy, Mode};
use vite_assets_spa::{FileType, LoadError, ManifestStore, ResolveError, ResolvedAssets};

use crate::escape_html;

/// Failed to render the references to some assets
#[derive(Debug, Error)]
pub enum RenderError {
    /// The manifest could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The entry point could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The manifest references a file which is not in the assets directory
    #[error("output file {path:?} is referenced by the Vite manifest but is missing")]
    MissingOutputFile {
        /// Where the file was expected
        path: Utf8PathBuf,
    },

    /// Could not join the blocking task loading the manifest
    #[error("error from async runtime")]
    Runtime(#[from] JoinError),
}

/// Renders the HTML tags referencing the assets of a Vite app.
///
/// In development mode, tags point to the Vite dev server and the manifest is
/// never read. In production mode, entry points are resolved through the
/// manifest to the files of the build output.
#[derive(Debug, Clone)]
pub struct AssetRenderer {
    settings: Arc<AssetsSettings>,
    store: Arc<dyn ManifestStore>,
}

fn script_tag(src: &str) -> String {
    format!(r#"<script type="module" src="{}"></script>"#, escape_html(src))
}

fn stylesheet_tag(href: &str) -> String {
    format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(href))
}

impl AssetRenderer {
    /// Create a renderer from the settings and the store to load the manifest
    /// from
    #[must_use]
    pub fn new(settings: Arc<AssetsSettings>, store: Arc<dyn ManifestStore>) -> Self {
        Self { settings, store }
    }

    /// The settings this renderer was built with
    #[must_use]
    pub fn settings(&self) -> &AssetsSettings {
        &self.settings
    }

    /// The tag loading the Vite HMR client.
    ///
    /// Empty in production mode.
    #[must_use]
    pub fn hmr_client_tag(&self) -> String {
        match self.settings.mode {
            Mode::Development => script_tag(&self.settings.dev_server_url("@vite/client")),
            Mode::Production => String::new(),
        }
    }

    /// The tags referencing everything the given entry point needs, one per
    /// line.
    ///
    /// # Errors
    ///
    /// In production mode, returns an error if the manifest can't be loaded,
    /// if the entry point is not in it, or if an output file is missing and
    /// the policy says so.
    #[tracing::instrument(
        name = "assets.render",
        skip_all,
        fields(%source_path, mode = %self.settings.mode),
    )]
    pub fn asset_tags(&self, source_path: &str) -> Result<String, RenderError> {
        match self.settings.mode {
            Mode::Development => Ok(self.dev_server_tag(source_path)),
            Mode::Production => self.production_tags(source_path),
        }
    }

    /// Resolve an entry point through the manifest, whatever the mode is
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest can't be loaded or if the entry point
    /// is not in it
    pub fn resolve(&self, source_path: &str) -> Result<ResolvedAssets, RenderError> {
        let manifest = self.store.load(&self.settings.manifest_path)?;
        Ok(manifest.resolve(source_path)?)
    }

    /// Load the manifest ahead of the first render, so that a missing or
    /// invalid manifest is reported at startup.
    ///
    /// Does nothing in development mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest can't be loaded
    #[tracing::instrument(
        name = "assets.preload",
        skip_all,
        fields(path = %self.settings.manifest_path),
    )]
    pub async fn preload(&self) -> Result<(), RenderError> {
        if self.settings.mode.is_development() {
            debug!("Development mode, not loading the Vite manifest");
            return Ok(());
        }

        let store = Arc::clone(&self.store);
        let path = self.settings.manifest_path.clone();
        let span = tracing::Span::current();
        let manifest =
            tokio::task::spawn_blocking(move || span.in_scope(|| store.load(&path))).await??;

        info!(
            chunks = manifest.len(),
            entries = manifest.entries().count(),
            "Loaded the Vite manifest"
        );

        Ok(())
    }

    fn dev_server_tag(&self, source_path: &str) -> String {
        let url = self.settings.dev_server_url(source_path);
        match FileType::from_path(Utf8Path::new(source_path)) {
            FileType::Stylesheet => stylesheet_tag(&url),
            FileType::Script | FileType::Other => script_tag(&url),
        }
    }

    fn production_tags(&self, source_path: &str) -> Result<String, RenderError> {
        let assets = self.resolve(source_path)?;

        let mut tags = Vec::with_capacity(assets.scripts.len() + assets.stylesheets.len());
        for file in &assets.scripts {
            if self.check_output_file(file)? {
                tags.push(script_tag(&self.settings.static_url(file.as_str())));
            }
        }

        for file in &assets.stylesheets {
            if self.check_output_file(file)? {
                tags.push(stylesheet_tag(&self.settings.static_url(file.as_str())));
            }
        }

        Ok(tags.join("\n"))
    }

    /// Whether the output file exists. A missing file is either an error or
    /// `false`, depending on the policy.
    fn check_output_file(&self, file: &Utf8Path) -> Result<bool, RenderError> {
        let path = self.settings.output_file_path(file);
        if path.exists() {
            return Ok(true);
        }

        match self.settings.missing_files {
            MissingFilePolicy::Error => Err(RenderError::MissingOutputFile { path }),
            MissingFilePolicy::Warn => {
                warn!(%path, "Output file referenced by the Vite manifest is missing, skipping");
                Ok(false)
            }
        }
    }
}
