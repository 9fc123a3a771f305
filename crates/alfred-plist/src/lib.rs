//! Property-list output for workflow side effects.
//!
//! Only writing is supported: `{{token}}` templates are rendered and web
//! location (`.webloc`) shortcut files are produced from them.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use alfred_core::xml::escape_xml;

pub const WEBLOC_EXTENSION: &str = "webloc";

const WEBLOC_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>URL</key>
	<string>{{url}}</string>
</dict>
</plist>
"#;

pub fn render_template(template: &str, vars: &BTreeMap<String, String>) -> String {
    vars.iter().fold(template.to_owned(), |acc, (key, value)| {
        let token = format!("{{{{{key}}}}}");
        acc.replace(&token, value)
    })
}

pub fn render_webloc(url: &str) -> String {
    let mut vars = BTreeMap::new();
    vars.insert("url".to_string(), escape_xml(url));
    render_template(WEBLOC_TEMPLATE, &vars)
}

/// Writes `<folder>/<name>.webloc` pointing at `url` and returns its path.
/// Path separators and colons in `name` are replaced so the file always lands
/// directly inside `folder`.
pub fn write_webloc(folder: impl AsRef<Path>, name: &str, url: &str) -> Result<PathBuf> {
    let folder = folder.as_ref();
    let file_stem = sanitize_file_stem(name);
    if file_stem.is_empty() {
        bail!("shortcut name must not be empty");
    }

    fs::create_dir_all(folder)
        .with_context(|| format!("failed to create shortcut folder: {}", folder.display()))?;

    let output_path = folder.join(format!("{file_stem}.{WEBLOC_EXTENSION}"));
    fs::write(&output_path, render_webloc(url))
        .with_context(|| format!("failed to write shortcut: {}", output_path.display()))?;
    Ok(output_path)
}

fn sanitize_file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|ch| if matches!(ch, '/' | ':') { '-' } else { ch })
        .collect()
}
