// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::ConfigurationSection;

fn filter_example() -> &'static str {
    "info,vite_assets_spa=debug"
}

/// Configuration related to logging
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TelemetryConfig {
    /// Filter directives for the logs, in the `RUST_LOG` syntax.
    ///
    /// The `RUST_LOG` environment variable takes precedence over this.
    /// Defaults to `info` if neither is set.
    #[schemars(example = "filter_example")]
    pub filter: Option<String>,
}

impl TelemetryConfig {
    /// Returns true if all fields are at their default values
    pub(crate) fn is_default(&self) -> bool {
        self.filter.is_none()
    }
}

impl ConfigurationSection for TelemetryConfig {
    const PATH: Option<&'static str> = Some("telemetry");
}
