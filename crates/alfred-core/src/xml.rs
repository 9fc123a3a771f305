use crate::Item;

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

pub fn render_feedback(items: &[Item], query: &str) -> String {
    let mut output = String::with_capacity(128 + items.len() * 160);
    output.push_str(XML_DECLARATION);
    output.push('\n');

    if items.is_empty() {
        output.push_str(&format!("<items query=\"{}\"/>\n", escape_xml(query)));
        return output;
    }

    output.push_str(&format!("<items query=\"{}\">\n", escape_xml(query)));
    for item in items {
        render_item(&mut output, item);
    }
    output.push_str("</items>\n");
    output
}

fn render_item(output: &mut String, item: &Item) {
    output.push_str("  <item");
    push_attribute(output, "uid", item.uid.as_deref());
    push_attribute(output, "arg", item.arg.as_deref());
    push_attribute(
        output,
        "valid",
        item.valid.map(|valid| if valid { "yes" } else { "no" }),
    );
    push_attribute(output, "autocomplete", item.autocomplete.as_deref());
    push_attribute(output, "type", item.kind.map(|kind| kind.as_str()));
    output.push_str(">\n");

    push_element(output, "title", None, &item.title);
    if let Some(subtitle) = item.subtitle.as_deref() {
        push_element(output, "subtitle", None, subtitle);
    }
    if let Some(mods) = item.mods.as_ref() {
        for (modifier, config) in mods {
            if let Some(subtitle) = config.subtitle.as_deref() {
                push_element(output, "subtitle", Some(("mod", modifier)), subtitle);
            }
        }
    }
    if let Some(icon) = item.icon.as_ref() {
        let icon_type = icon.r#type.as_deref().map(|value| ("type", value));
        push_element(output, "icon", icon_type, &icon.path);
    }

    output.push_str("  </item>\n");
}

fn push_attribute(output: &mut String, name: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&escape_xml(value));
    output.push('"');
}

fn push_element(output: &mut String, name: &str, attribute: Option<(&str, &str)>, text: &str) {
    output.push_str("    <");
    output.push_str(name);
    if let Some((key, value)) = attribute {
        push_attribute(output, key, Some(value));
    }
    output.push('>');
    output.push_str(&escape_xml(text));
    output.push_str("</");
    output.push_str(name);
    output.push_str(">\n");
}

pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // XML 1.0 has no representation for most C0 controls.
            c if c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reverses [`escape_xml`]; also accepts decimal and hex character references.
pub fn unescape_xml(raw: &str) -> Option<String> {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find(';')?;
        let entity = &after[..end];

        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => decode_char_reference(entity)?,
        };
        output.push(decoded);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Some(output)
}

fn decode_char_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
