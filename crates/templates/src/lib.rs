// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Rendering of the HTML tags referencing the Vite assets

mod functions;
mod renderer;

pub use self::{
    functions::register,
    renderer::{AssetRenderer, RenderError},
};

/// Escape the given string for use in HTML
///
/// It uses the same crate as the one used by the minijinja templates
#[must_use]
pub fn escape_html(input: &str) -> String {
    v_htmlescape::escape(input).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("main-abc123.js"), "main-abc123.js");
        assert_eq!(
            escape_html(r#"a"b<c>&d'e"#),
            "a&quot;b&lt;c&gt;&amp;d&#x27;e"
        );
    }
}
