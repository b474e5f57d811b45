//! Canonical names and command placeholders.
//!
//! Recipe authors write `snake_case` attributes and `CamelCase` template
//! names. Compiled graphs only carry hyphenated names, and command strings
//! refer to inputs as `{{inputs.name}}` rather than `{{self.name}}`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    // literal pattern, always compiles
    Regex::new(r"\{\{(\s*)([^{}]*?)(\s*)\}\}").expect("valid placeholder pattern")
});

/// Canonical name of an input, output, task or argument: underscores become hyphens.
///
/// ```
/// assert_eq!(honeycomb_dsl::naming::param_name("sensor_grid"), "sensor-grid");
/// ```
#[must_use]
pub fn param_name(name: &str) -> String {
    name.trim().replace('_', "-")
}

/// Canonical name of a template: `CamelCase` and `snake_case` both become kebab-case.
///
/// ```
/// assert_eq!(honeycomb_dsl::naming::template_name("DoubleNumber"), "double-number");
/// assert_eq!(honeycomb_dsl::naming::template_name("ray_trace"), "ray-trace");
/// ```
#[must_use]
pub fn template_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.trim().chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
            prev_lower_or_digit = false;
        } else if ch.is_uppercase() {
            if prev_lower_or_digit && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Rewrite every `{{ ... }}` placeholder in `text`.
///
/// `self.` becomes `inputs.` and underscores in input names become hyphens.
/// Other placeholders, such as `{{item.grid_id}}`, keep their field names
/// verbatim because loop items are not renamed. Whitespace around the
/// reference is kept, text outside placeholders is untouched, and rewriting
/// an already rewritten string is a no-op.
#[must_use]
pub fn rewrite_placeholders(text: &str) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            format!(
                "{{{{{}{}{}}}}}",
                &caps[1],
                rewrite_reference(&caps[2]),
                &caps[3]
            )
        })
        .into_owned()
}

fn rewrite_reference(reference: &str) -> String {
    match reference
        .strip_prefix("self.")
        .or_else(|| reference.strip_prefix("inputs."))
    {
        Some(name) => format!("inputs.{}", name.replace('_', "-")),
        None => reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("model_folder"), "model-folder");
        assert_eq!(param_name("already-fine"), "already-fine");
    }

    #[test]
    fn test_template_name() {
        assert_eq!(template_name("DoubleNumber"), "double-number");
        assert_eq!(template_name("SplitGridFolder"), "split-grid-folder");
        assert_eq!(template_name("ray_trace"), "ray-trace");
        assert_eq!(template_name("daylight-factor"), "daylight-factor");
        assert_eq!(template_name("Step2Run"), "step2-run");
    }

    #[test]
    fn test_rewrite_self_reference() {
        assert_eq!(
            rewrite_placeholders("echo {{self.input_value}} > out.txt"),
            "echo {{inputs.input-value}} > out.txt"
        );
    }

    #[test]
    fn test_rewrite_keeps_spacing_and_text() {
        assert_eq!(
            rewrite_placeholders("cp {{ self.grid_file }} grid_copy.pts"),
            "cp {{ inputs.grid-file }} grid_copy.pts"
        );
    }

    #[test]
    fn test_rewrite_multiple_placeholders() {
        let out = rewrite_placeholders("run {{self.a_b}} {{item.sensor_count}} {{inputs.c_d}}");
        assert_eq!(out, "run {{inputs.a-b}} {{item.sensor_count}} {{inputs.c-d}}");
    }

    #[test]
    fn test_loop_item_fields_are_kept() {
        assert_eq!(
            rewrite_placeholders("runs/{{ item.grid_count }}/{{item}}"),
            "runs/{{ item.grid_count }}/{{item}}"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite_placeholders("{{self.x_y}}/{{ self.z }}");
        assert_eq!(rewrite_placeholders(&once), once);
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        assert_eq!(rewrite_placeholders("plain_text {not one}"), "plain_text {not one}");
    }
}
