// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeSet, fmt::Write as _, process::ExitCode};

use anyhow::Context as _;
use camino::Utf8PathBuf;
use clap::Parser;
use figment::Figment;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, info_span};
use vite_assets_config::{ConfigurationSectionExt, ViteConfig};
use vite_assets_spa::{FsManifestStore, ManifestStore as _};

use crate::util::settings_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Check that every entry point of the manifest resolves, and that the
    /// files it references are in the assets directory
    Check,

    /// List the entry points of the manifest with their output file
    Entries,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;

        let config = ViteConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let settings = settings_from_config(&config)?;
        let store = FsManifestStore::new();
        let manifest = store
            .load(&settings.manifest_path)
            .with_context(|| format!("could not load the manifest at {}", settings.manifest_path))?;

        match self.subcommand {
            SC::Check => {
                let _span = info_span!("cli.manifest.check").entered();

                let mut dangling = BTreeSet::new();
                let mut missing: BTreeSet<Utf8PathBuf> = BTreeSet::new();
                let mut entries = 0;

                for (key, _) in manifest.entries() {
                    let resolved = manifest.resolve(key)?;
                    entries += 1;

                    for import in resolved.dangling_imports {
                        dangling.insert((import.importer, import.import));
                    }

                    for file in resolved.scripts.iter().chain(&resolved.stylesheets) {
                        let path = settings.output_file_path(file);
                        if !path.exists() {
                            missing.insert(path);
                        }
                    }
                }

                for (importer, import) in &dangling {
                    error!(%importer, %import, "Import points to a chunk missing from the manifest");
                }

                for path in &missing {
                    error!(%path, "Output file referenced by the manifest is missing");
                }

                if dangling.is_empty() && missing.is_empty() {
                    info!(entries, "Vite manifest looks good");
                    Ok(ExitCode::SUCCESS)
                } else {
                    error!(
                        dangling_imports = dangling.len(),
                        missing_files = missing.len(),
                        "Vite manifest has problems"
                    );
                    Ok(ExitCode::FAILURE)
                }
            }

            SC::Entries => {
                let _span = info_span!("cli.manifest.entries").entered();

                let mut output = String::new();
                for (key, entry) in manifest.entries() {
                    writeln!(output, "{key}\t{}", entry.file)?;
                }

                tokio::io::stdout().write_all(output.as_bytes()).await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
