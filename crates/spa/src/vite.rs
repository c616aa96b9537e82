// Copyright 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    collections::{BTreeMap, HashSet},
    str::FromStr,
};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// One chunk of the Vite manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// The name of the chunk, if any
    pub name: Option<String>,

    /// The source file this chunk was built from
    pub src: Option<String>,

    /// The output file, relative to the assets directory
    pub file: Utf8PathBuf,

    /// Whether this chunk is an entry point of the build
    #[serde(default)]
    pub is_entry: bool,

    /// Whether this chunk is only loaded through dynamic imports
    #[serde(default)]
    pub is_dynamic_entry: bool,

    /// Stylesheets extracted from this chunk
    #[serde(default)]
    pub css: Vec<Utf8PathBuf>,

    /// Other assets referenced by this chunk
    #[serde(default)]
    pub assets: Vec<Utf8PathBuf>,

    /// Keys of the chunks this one statically imports
    #[serde(default)]
    pub imports: Vec<String>,

    /// Keys of the chunks this one dynamically imports
    #[serde(default)]
    pub dynamic_imports: Vec<String>,
}

impl ManifestEntry {
    /// The type of the output file of this chunk
    #[must_use]
    pub fn file_type(&self) -> FileType {
        FileType::from_path(&self.file)
    }
}

/// The kind of an output file, guessed from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// A JavaScript module
    Script,

    /// A CSS stylesheet
    Stylesheet,

    /// Anything else: fonts, images, etc.
    Other,
}

impl FileType {
    /// Guess the type of a file from its extension
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("js" | "mjs" | "cjs") => Self::Script,
            Some("css") => Self::Stylesheet,
            _ => Self::Other,
        }
    }
}

/// The parsed Vite manifest, mapping source keys to chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    inner: BTreeMap<String, ManifestEntry>,
}

/// An import edge pointing to a chunk missing from the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingImport {
    /// The key of the chunk declaring the import
    pub importer: String,

    /// The key which could not be found
    pub import: String,
}

/// The assets needed to render an entry point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedAssets {
    /// Scripts to load, dependencies first
    pub scripts: Vec<Utf8PathBuf>,

    /// Stylesheets to load, in the order they were first seen
    pub stylesheets: Vec<Utf8PathBuf>,

    /// Import edges which were skipped because they point nowhere
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dangling_imports: Vec<DanglingImport>,
}

/// Failed to resolve the assets of an entry point
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The entry point is not in the manifest
    #[error("could not find entry {entry:?} in the Vite manifest ({} known entries)", .known.len())]
    UnknownEntry {
        /// The requested key
        entry: String,

        /// All the keys of the manifest, sorted
        known: Vec<String>,
    },
}

impl FromStr for Manifest {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl Manifest {
    /// Parse a manifest from raw JSON bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid Vite manifest
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Get a chunk by its key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.inner.get(key)
    }

    /// Number of chunks in the manifest
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the manifest has no chunk at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over all chunks, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.inner.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Iterate over the chunks flagged as entry points, sorted by key
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.iter().filter(|(_, entry)| entry.is_entry)
    }

    /// Resolve the scripts and stylesheets needed by an entry point.
    ///
    /// Static imports are followed depth-first, each chunk coming after the
    /// chunks it imports. Dynamic imports are left to the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry point is not in the manifest
    pub fn resolve(&self, entry: &str) -> Result<ResolvedAssets, ResolveError> {
        let Some((key, chunk)) = self.inner.get_key_value(entry) else {
            return Err(ResolveError::UnknownEntry {
                entry: entry.to_owned(),
                known: self.inner.keys().cloned().collect(),
            });
        };

        if !chunk.is_entry {
            debug!(entry, "Resolving assets of a chunk which is not an entry point");
        }

        let mut resolver = Resolver::new(self);
        resolver.visited.insert(key);
        resolver.walk(key, chunk);
        Ok(resolver.finish())
    }
}

/// State of a single resolution
struct Resolver<'a> {
    manifest: &'a Manifest,
    visited: HashSet<&'a str>,
    seen_scripts: HashSet<&'a Utf8Path>,
    seen_stylesheets: HashSet<&'a Utf8Path>,
    result: ResolvedAssets,
}

impl<'a> Resolver<'a> {
    fn new(manifest: &'a Manifest) -> Self {
        Self {
            manifest,
            visited: HashSet::new(),
            seen_scripts: HashSet::new(),
            seen_stylesheets: HashSet::new(),
            result: ResolvedAssets::default(),
        }
    }

    /// Walk the imports of `chunk` depth-first, emitting each chunk after the
    /// chunks it imports. The stack is explicit so that long import chains
    /// can't exhaust the thread stack.
    fn walk(&mut self, key: &'a str, chunk: &'a ManifestEntry) {
        let manifest = self.manifest;

        // Each frame holds a chunk and the index of its next import to follow
        let mut stack: Vec<(&'a str, &'a ManifestEntry, usize)> = vec![(key, chunk, 0)];
        while let Some(frame) = stack.last_mut() {
            let (key, chunk) = (frame.0, frame.1);
            let Some(import) = chunk.imports.get(frame.2) else {
                stack.pop();
                self.emit(chunk);
                continue;
            };
            frame.2 += 1;

            let Some((import_key, imported)) = manifest.inner.get_key_value(import) else {
                warn!(
                    importer = key,
                    import = import.as_str(),
                    "Skipping import of a chunk missing from the Vite manifest"
                );
                self.result.dangling_imports.push(DanglingImport {
                    importer: key.to_owned(),
                    import: import.clone(),
                });
                continue;
            };

            // The visited set is what stops import cycles
            if self.visited.insert(import_key) {
                stack.push((import_key, imported, 0));
            }
        }
    }

    fn emit(&mut self, chunk: &'a ManifestEntry) {
        match chunk.file_type() {
            FileType::Script => {
                if self.seen_scripts.insert(&chunk.file) {
                    self.result.scripts.push(chunk.file.clone());
                }
            }
            FileType::Stylesheet => self.push_stylesheet(&chunk.file),
            FileType::Other => {}
        }

        for css in &chunk.css {
            self.push_stylesheet(css);
        }
    }

    fn push_stylesheet(&mut self, file: &'a Utf8Path) {
        if self.seen_stylesheets.insert(file) {
            self.result.stylesheets.push(file.to_owned());
        }
    }

    fn finish(self) -> ResolvedAssets {
        self.result
    }
}
