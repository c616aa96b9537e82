// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use vite_assets_config::{EnvironmentSignals, ViteConfig};
use vite_assets_data_model::AssetsSettings;
use vite_assets_spa::FsManifestStore;
use vite_assets_templates::AssetRenderer;

pub fn settings_from_config(config: &ViteConfig) -> Result<Arc<AssetsSettings>, anyhow::Error> {
    let signals = EnvironmentSignals::from_process();
    let settings = config
        .settings(&signals)
        .context("invalid Vite dev server settings")?;

    debug!(
        mode = %settings.mode,
        assets = %settings.assets_path,
        manifest = %settings.manifest_path,
        "Resolved the Vite settings"
    );

    Ok(Arc::new(settings))
}

pub fn renderer_from_config(config: &ViteConfig) -> Result<AssetRenderer, anyhow::Error> {
    let settings = settings_from_config(config)?;
    Ok(AssetRenderer::new(settings, Arc::new(FsManifestStore::new())))
}
