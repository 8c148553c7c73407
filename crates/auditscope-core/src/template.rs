//! Event type templates.
//!
//! Integrations name events from call metadata, e.g. `"{verb}:{controller}"`
//! rendered to `"POST:Orders"`. Rendering happens before the scope is
//! created; the factory only ever sees the final string.

use std::collections::HashMap;

/// An event type pattern with `{name}` placeholders.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::EventTypeTemplate;
///
/// let template = EventTypeTemplate::new("{verb}:{controller}");
/// let event_type = template.render(&[("verb", "POST"), ("controller", "Orders")]);
/// assert_eq!(event_type, "POST:Orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeTemplate {
    pattern: String,
}

impl EventTypeTemplate {
    /// Creates a template from a pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Returns the raw pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Replaces each `{name}` with its value.
    ///
    /// Unknown placeholders and unmatched braces are left as written.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let values: HashMap<&str, &str> = values.iter().copied().collect();
        let mut out = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match values.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}
