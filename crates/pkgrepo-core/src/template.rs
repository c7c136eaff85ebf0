//! Release header templates.
//!
//! Templates use `{{ .Field }}` placeholders:
//!
//! ```text
//! Origin: Acme
//! Suite: {{ .CodeName }}
//! Components: {{ .Component }}
//! Architectures: {{ .Architectures }}
//! ```
//!
//! Everything outside a placeholder is copied through unchanged. Referencing
//! a field that was not supplied is an error rather than an empty string, so
//! a typo in a template cannot silently produce a broken Release header.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed placeholder at byte {0}")]
    Unclosed(usize),

    #[error("malformed placeholder '{0}': expected '{{{{ .Name }}}}'")]
    Malformed(String),

    #[error("unknown template field '{0}'")]
    UnknownField(String),
}

/// Render `template`, replacing each `{{ .Name }}` with the value of `Name`
/// from `fields`.
///
/// # Example
///
/// ```
/// use pkgrepo_core::template::render;
///
/// let out = render("Suite: {{ .CodeName }}\n", &[("CodeName", "jammy")]).unwrap();
/// assert_eq!(out, "Suite: jammy\n");
/// ```
///
/// # Errors
///
/// Returns a [`TemplateError`] for unterminated or malformed placeholders
/// and for fields not present in `fields`.
pub fn render(template: &str, fields: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateError::Unclosed(offset + start));
        };

        let inner = after_open[..end].trim();
        let name = inner
            .strip_prefix('.')
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
            .ok_or_else(|| TemplateError::Malformed(inner.to_string()))?;

        let value = fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| TemplateError::UnknownField(name.to_string()))?;
        out.push_str(value);

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}
