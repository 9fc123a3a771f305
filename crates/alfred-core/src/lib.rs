//! Alfred feedback model and the two wire formats spoken with the launcher.
//!
//! - `Feedback`/`Item`: result items, serialized as Alfred XML or JSON.
//! - `xml`: markup escaping and the feedback document writer.
//! - `args`: the `<root><key>value</key></root>` action argument encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod args;
pub mod xml;

pub use args::{ArgsError, decode_args, encode_args};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Feedback {
    pub items: Vec<Item>,
}

impl Feedback {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Renders the legacy Alfred XML document. The query text is carried on
    /// the root element so the launcher log shows what produced the list.
    pub fn to_xml(&self, query: &str) -> String {
        xml::render_feedback(&self.items, query)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Default,
    File,
    #[serde(rename = "file:skipcheck")]
    FileSkipCheck,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::File => "file",
            Self::FileSkipCheck => "file:skipcheck",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<ItemIcon>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mods: Option<BTreeMap<String, ItemModifier>>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            uid: None,
            title: title.into(),
            subtitle: None,
            arg: None,
            valid: None,
            autocomplete: None,
            icon: None,
            kind: None,
            mods: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }

    pub fn with_icon(mut self, icon: ItemIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_mod(mut self, modifier: impl Into<String>, config: ItemModifier) -> Self {
        self.mods
            .get_or_insert_with(BTreeMap::new)
            .insert(modifier.into(), config);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ItemModifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl ItemModifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemIcon {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

impl ItemIcon {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            r#type: None,
        }
    }

    /// Icon taken from the file at `path` itself.
    pub fn file_icon(path: impl Into<String>) -> Self {
        Self::new(path).with_type("fileicon")
    }

    /// Icon of the given UTI, e.g. `public.folder`.
    pub fn file_type(uti: impl Into<String>) -> Self {
        Self::new(uti).with_type("filetype")
    }

    pub fn with_type(mut self, icon_type: impl Into<String>) -> Self {
        self.r#type = Some(icon_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_serializes() {
        let payload = Feedback::new(vec![Item::new("hello").with_subtitle("world")]);
        let json = payload.to_json().expect("serialize feedback");
        assert!(json.contains("items"), "json should contain items field");
    }

    #[test]
    fn item_optional_fields_serialize_only_when_present() {
        let base = Item::new("project");
        let json = serde_json::to_string(&base).expect("serialize item");

        assert!(json.contains("title"), "title must always serialize");
        assert!(!json.contains("uid"), "uid must be omitted when absent");
        assert!(
            !json.contains("subtitle"),
            "subtitle must be omitted when absent"
        );
        assert!(
            !json.contains("autocomplete"),
            "autocomplete must be omitted when absent"
        );
        assert!(!json.contains("mods"), "mods must be omitted when absent");
        assert!(!json.contains("type"), "type must be omitted when absent");
    }

    #[test]
    fn item_kind_serializes_under_type_key() {
        let item = Item::new("notes.txt").with_kind(ItemKind::FileSkipCheck);
        let json = serde_json::to_string(&item).expect("serialize item");

        assert!(json.contains("\"type\":\"file:skipcheck\""));
    }

    #[test]
    fn modifier_subtitle_is_serialized() {
        let item = Item::new("project")
            .with_arg("/tmp/project")
            .with_valid(true)
            .with_mod(
                "cmd",
                ItemModifier::new()
                    .with_subtitle("Open in Finder")
                    .with_arg("/tmp/project")
                    .with_valid(true),
            );

        let json = serde_json::to_string(&item).expect("serialize item with modifiers");
        assert!(json.contains("\"mods\""), "modifiers should be present");
        assert!(json.contains("\"cmd\""), "cmd modifier should be present");
        assert!(json.contains("Open in Finder"));
    }

    #[test]
    fn file_icon_helpers_set_icon_type() {
        assert_eq!(
            ItemIcon::file_icon("/Applications").r#type.as_deref(),
            Some("fileicon")
        );
        assert_eq!(
            ItemIcon::file_type("public.folder").r#type.as_deref(),
            Some("filetype")
        );
    }
}
