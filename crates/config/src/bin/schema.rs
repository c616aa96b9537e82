// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::r#gen::SchemaSettings;

fn main() {
    let generator = SchemaSettings::draft07()
        .with(|settings| {
            settings.option_nullable = true;
            settings.option_add_null_type = false;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<vite_assets_config::RootConfig>();

    serde_json::to_writer_pretty(std::io::stdout(), &schema).expect("Failed to serialize schema");
}
