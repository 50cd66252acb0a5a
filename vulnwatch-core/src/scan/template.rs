//! Placeholder substitution for scanner command templates.

pub const PROJECT_PATH: &str = "PROJECT_PATH";
pub const OUTPUT_PATH: &str = "OUTPUT_PATH";
pub const IMAGE_URL: &str = "IMAGE_URL";

/// Replaces each `{KEY}` with its value. Unknown braces are left alone so
/// templates may carry shell or `jq` syntax.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |rendered, (key, value)| {
            rendered.replace(&format!("{{{key}}}"), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders_only() {
        let rendered = render(
            "semgrep --config auto --json {PROJECT_PATH} | jq '{results}' > {OUTPUT_PATH}",
            &[(PROJECT_PATH, "/w/project/7/"), (OUTPUT_PATH, "/w/reports/7/0.json")],
        );
        assert_eq!(
            rendered,
            "semgrep --config auto --json /w/project/7/ | jq '{results}' > /w/reports/7/0.json"
        );
    }
}
