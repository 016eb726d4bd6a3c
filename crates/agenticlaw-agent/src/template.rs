//! Minimal `{{placeholder}}` substitution standing in for the out-of-scope
//! templating engine (spec §4.7 [AMBIENT]), grounded on
//! `beezle_bug/template.py`'s narrow `TemplateLoader.render(template,
//! **vars)` contract.

use std::collections::HashMap;

/// Replaces every `{{key}}` occurrence with its value from `vars`.
/// Unmatched placeholders are left verbatim — callers decide whether that's
/// an error.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("name", "Alice".to_string());
        assert_eq!(render("hello {{name}}", &vars), "hello Alice");
    }

    #[test]
    fn leaves_unknown_placeholders_verbatim() {
        let vars = HashMap::new();
        assert_eq!(render("hello {{name}}", &vars), "hello {{name}}");
    }
}
