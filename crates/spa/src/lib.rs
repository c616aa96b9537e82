// Copyright 2025 New Vector Ltd.
// Copyright 2022-2024 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! A crate to help render the assets of apps built by Vite.
//!
//! It parses the manifest Vite writes next to the build output, and resolves
//! an entry point to the ordered list of scripts and stylesheets it needs.

mod store;
mod vite;

pub use self::{
    store::{FsManifestStore, LoadError, ManifestStore, StaticManifestStore},
    vite::{
        DanglingImport, FileType, Manifest as ViteManifest, ManifestEntry, ResolveError,
        ResolvedAssets,
    },
};
