// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use figment::Figment;
use tokio::io::AsyncWriteExt;
use tracing::info_span;
use vite_assets_config::{ConfigurationSectionExt, ViteConfig};

use crate::util::renderer_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Print the tags referencing the given entry points, in the configured
    /// mode
    Render {
        /// Source paths of the entry points, as found in the manifest
        #[arg(required = true)]
        entries: Vec<String>,

        /// Also print the tag loading the HMR client
        #[arg(long)]
        hmr: bool,
    },

    /// Print the files needed by an entry point as JSON, whatever the mode
    Resolve {
        /// Source path of the entry point
        entry: String,
    },
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;

        let config = ViteConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let renderer = renderer_from_config(&config)?;

        let output = match self.subcommand {
            SC::Render { entries, hmr } => {
                let _span = info_span!("cli.assets.render").entered();
                renderer.preload().await?;

                let mut lines = Vec::with_capacity(entries.len() + 1);
                if hmr {
                    let tag = renderer.hmr_client_tag();
                    if !tag.is_empty() {
                        lines.push(tag);
                    }
                }

                for entry in &entries {
                    let tags = renderer
                        .asset_tags(entry)
                        .with_context(|| format!("could not render the assets of {entry:?}"))?;
                    if !tags.is_empty() {
                        lines.push(tags);
                    }
                }

                lines.join("\n")
            }

            SC::Resolve { entry } => {
                let _span = info_span!("cli.assets.resolve").entered();

                let resolved = renderer
                    .resolve(&entry)
                    .with_context(|| format!("could not resolve {entry:?}"))?;
                serde_json::to_string_pretty(&resolved)?
            }
        };

        let mut stdout = tokio::io::stdout();
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;

        Ok(ExitCode::SUCCESS)
    }
}
