// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod assets;
mod config;
mod manifest;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Inspect the Vite manifest
    Manifest(self::manifest::Options),

    /// Render the tags referencing the assets
    Assets(self::assets::Options),
}

#[derive(Parser, Debug)]
#[command(version = crate::VERSION)]
pub struct Options {
    /// Path to the configuration file
    #[arg(short, long, global = true, action = ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Subcommand,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            S::Config(c) => c.run(figment).await,
            S::Manifest(c) => c.run(figment).await,
            S::Assets(c) => c.run(figment).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the VITE_ASSETS_CONFIG environment variable
            std::env::var("VITE_ASSETS_CONFIG")
                // Default to "config.yaml"
                .unwrap_or_else(|_| "config.yaml".to_owned())
                // Split the file list on `:`
                .split(':')
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            self.config.clone()
        };

        let files = configs
            .into_iter()
            .fold(Figment::new(), |f, path| f.admerge(Yaml::file(path)));

        // Environment variables override the files
        files.merge(
            Env::prefixed("VITE_ASSETS_")
                .ignore(&["config"])
                .split("__"),
        )
    }
}
