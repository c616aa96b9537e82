// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! Runtime settings of the Vite assets integration, shared by the manifest
//! resolution and the rendering crates

mod site_config;

pub use self::site_config::{AssetsSettings, MissingFilePolicy, Mode};
