//! Built-in renderers. Each is a pure function of the resolved tokens.

use std::fmt::Write;

use super::ResolvedToken;

const BLOCK_HEADER: &str = "/**\n * Do not edit directly, this file was auto-generated.\n */\n\n";
const LINE_HEADER: &str = "// Do not edit directly, this file was auto-generated.\n\n";

pub fn css_variables(tokens: &[ResolvedToken]) -> Vec<u8> {
    let mut out = String::from(BLOCK_HEADER);
    out.push_str(":root {\n");
    for token in tokens {
        let _ = write!(out, "  --{}: {};", token.variable_name(), token.value);
        if !token.description.is_empty() {
            let comment = one_line(&token.description).replace("*/", "* /");
            let _ = write!(out, " /* {comment} */");
        }
        out.push('\n');
    }
    out.push_str("}\n");
    out.into_bytes()
}

pub fn scss_variables(tokens: &[ResolvedToken]) -> Vec<u8> {
    let mut out = String::from(LINE_HEADER);
    for token in tokens {
        let _ = write!(out, "${}: {};", token.variable_name(), token.value);
        if !token.description.is_empty() {
            let _ = write!(out, " // {}", one_line(&token.description));
        }
        out.push('\n');
    }
    out.into_bytes()
}

/// `export const tokens = { category: { token: "value" } };` plus a default
/// export of the same object.
pub fn es6_module(tokens: &[ResolvedToken]) -> Vec<u8> {
    let mut out = String::from(BLOCK_HEADER);
    out.push_str("export const tokens = {\n");

    let mut open_category: Option<&str> = None;
    for token in tokens {
        if open_category != Some(token.category.as_str()) {
            if open_category.is_some() {
                out.push_str("  },\n");
            }
            let _ = writeln!(out, "  {}: {{", js_key(&token.category));
            open_category = Some(token.category.as_str());
        }
        if !token.description.is_empty() {
            let _ = writeln!(out, "    // {}", one_line(&token.description));
        }
        let _ = writeln!(
            out,
            "    {}: {},",
            js_key(&token.name),
            serde_json::Value::String(token.value.clone())
        );
    }
    if open_category.is_some() {
        out.push_str("  },\n");
    }

    out.push_str("};\n\nexport default tokens;\n");
    out.into_bytes()
}

fn one_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bare identifier when valid, otherwise a JSON string literal.
fn js_key(key: &str) -> String {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        None => false,
    };
    if valid {
        key.to_string()
    } else {
        serde_json::Value::String(key.to_string()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(category: &str, name: &str, value: &str, description: &str) -> ResolvedToken {
        ResolvedToken {
            category: category.into(),
            name: name.into(),
            value: value.into(),
            description: description.into(),
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf-8")
    }

    #[test]
    fn css_block_with_descriptions() {
        let out = text(css_variables(&[
            token("color", "primary", "#112233", "Brand */ colour"),
            token("size", "gap", "4px", ""),
        ]));
        assert!(out.starts_with("/**\n * Do not edit directly"));
        assert!(out.contains(":root {\n  --color-primary: #112233; /* Brand * / colour */\n  --size-gap: 4px;\n}\n"));
    }

    #[test]
    fn css_with_no_tokens_is_an_empty_block() {
        let out = text(css_variables(&[]));
        assert!(out.ends_with(":root {\n}\n"));
    }

    #[test]
    fn scss_lines() {
        let out = text(scss_variables(&[
            token("color", "primary", "#112233", "Brand\ncolour"),
            token("size", "gap", "4px", ""),
        ]));
        assert!(out.contains("$color-primary: #112233; // Brand colour\n"));
        assert!(out.contains("$size-gap: 4px;\n"));
    }

    #[test]
    fn es6_nested_object() {
        let out = text(es6_module(&[
            token("color", "primary", "#112233", ""),
            token("color", "on-primary", "say \"hi\"", "Text"),
            token("size", "gap", "4px", ""),
        ]));
        let expected = "export const tokens = {\n  color: {\n    primary: \"#112233\",\n    // Text\n    \"on-primary\": \"say \\\"hi\\\"\",\n  },\n  size: {\n    gap: \"4px\",\n  },\n};\n\nexport default tokens;\n";
        assert!(out.ends_with(expected), "{out}");
    }

    #[test]
    fn es6_with_no_tokens() {
        let out = text(es6_module(&[]));
        assert!(out.ends_with("export const tokens = {\n};\n\nexport default tokens;\n"));
    }

    #[test]
    fn js_keys() {
        assert_eq!(js_key("primary"), "primary");
        assert_eq!(js_key("_x$1"), "_x$1");
        assert_eq!(js_key("100"), "\"100\"");
        assert_eq!(js_key(""), "\"\"");
    }
}
