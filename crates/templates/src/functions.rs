// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Template functions rendering the Vite asset references

use std::sync::Arc;

use minijinja::{
    Environment, Error, ErrorKind, State, Value,
    value::{Object, from_args},
};

use crate::AssetRenderer;

/// Register the `vite_hmr_client()` and `vite_asset(path)` functions on the
/// environment
pub fn register(env: &mut Environment<'_>, renderer: AssetRenderer) {
    env.add_global(
        "vite_hmr_client",
        Value::from_object(HmrClient {
            renderer: renderer.clone(),
        }),
    );
    env.add_global("vite_asset", Value::from_object(IncludeAsset { renderer }));
}

#[derive(Debug)]
struct HmrClient {
    renderer: AssetRenderer,
}

impl Object for HmrClient {
    fn call(self: &Arc<Self>, _state: &State, args: &[Value]) -> Result<Value, Error> {
        let (): () = from_args(args)?;
        Ok(Value::from_safe_string(self.renderer.hmr_client_tag()))
    }
}

#[derive(Debug)]
struct IncludeAsset {
    renderer: AssetRenderer,
}

impl Object for IncludeAsset {
    fn call(self: &Arc<Self>, _state: &State, args: &[Value]) -> Result<Value, Error> {
        let (path,): (&str,) = from_args(args)?;

        let tags = self.renderer.asset_tags(path).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("could not render the assets of {path:?}"),
            )
            .with_source(e)
        })?;

        Ok(Value::from_safe_string(tags))
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error as _, str::FromStr};

    use assert_matches::assert_matches;
    use indoc::indoc;
    use vite_assets_data_model::{AssetsSettings, MissingFilePolicy, Mode};
    use vite_assets_spa::{ResolveError, StaticManifestStore, ViteManifest};

    use super::*;
    use crate::RenderError;

    const PAGE: &str = indoc! {r"
        <head>
        {{ vite_hmr_client() }}
        {{ vite_asset('src/main.ts') }}
        </head>
    "};

    fn environment(mode: Mode) -> (Environment<'static>, AssetRenderer) {
        let settings = AssetsSettings {
            base_path: ".".into(),
            assets_path: "dist".into(),
            manifest_path: "dist/.vite/manifest.json".into(),
            dev_server_origin: "http://localhost:5173/".parse().unwrap(),
            static_url_prefix: "/static".to_owned(),
            mode,
            missing_files: MissingFilePolicy::Warn,
        };
        let manifest = ViteManifest::from_str(
            r#"{"src/main.ts": {"file": "assets/main-abc123.js", "isEntry": true}}"#,
        )
        .unwrap();
        let store = StaticManifestStore::new().with_manifest("dist/.vite/manifest.json", manifest);
        let renderer = AssetRenderer::new(Arc::new(settings), Arc::new(store));

        let mut env = Environment::new();
        register(&mut env, renderer.clone());
        env.add_template("page.html", PAGE).unwrap();
        (env, renderer)
    }

    #[test]
    fn test_development_page() {
        let (env, renderer) = environment(Mode::Development);
        let page = env.get_template("page.html").unwrap().render(()).unwrap();

        // Markup is inserted as is, even with auto-escaping
        assert!(page.contains(&renderer.hmr_client_tag()));
        assert!(page.contains(&renderer.asset_tags("src/main.ts").unwrap()));
        assert!(page.contains("<script type=\"module\""));
    }

    #[test]
    fn test_production_page() {
        let (env, _renderer) = environment(Mode::Production);

        // The output file is not on disk, so the reference is left out
        let page = env.get_template("page.html").unwrap().render(()).unwrap();
        assert!(!page.contains("<script"));

        let hmr = env.render_str("{{ vite_hmr_client() }}", ()).unwrap();
        assert_eq!(hmr, "");
    }

    #[test]
    fn test_render_error() {
        let (env, _renderer) = environment(Mode::Production);
        let error = env
            .render_str("{{ vite_asset('src/missing.ts') }}", ())
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidOperation);
        let source = error
            .source()
            .and_then(|source| source.downcast_ref::<RenderError>());
        assert_matches!(
            source,
            Some(RenderError::Resolve(ResolveError::UnknownEntry { entry, .. })) if entry == "src/missing.ts"
        );
    }

    #[test]
    fn test_invalid_arguments() {
        let (env, _renderer) = environment(Mode::Development);
        assert!(env.render_str("{{ vite_asset() }}", ()).is_err());
        assert!(env.render_str("{{ vite_hmr_client(1) }}", ()).is_err());
    }
}
