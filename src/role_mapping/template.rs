//! Role template definitions.

use serde::{Deserialize, Serialize};

/// A template that produces role names at authentication time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTemplate {
    /// Where the template source comes from
    pub template: TemplateSource,
    /// How the rendered template is interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TemplateFormat>,
}

impl RoleTemplate {
    /// Create an inline template.
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            template: TemplateSource::Inline {
                source: source.into(),
            },
            format: None,
        }
    }

    /// Create a template referencing a stored script.
    pub fn stored(id: impl Into<String>) -> Self {
        Self {
            template: TemplateSource::Stored { id: id.into() },
            format: None,
        }
    }

    /// Set the format.
    pub fn with_format(mut self, format: TemplateFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Whether the template could not be understood.
    pub fn is_invalid(&self) -> bool {
        matches!(self.template, TemplateSource::Invalid(_))
    }

    /// Parse a stringified template (`"{\"source\":\"...\"}"`) into its
    /// structured form. Strings that do not parse are left as they are.
    pub fn normalize(&mut self) {
        if let TemplateSource::Invalid(text) = &self.template {
            match serde_json::from_str::<TemplateSource>(text) {
                Ok(parsed @ (TemplateSource::Inline { .. } | TemplateSource::Stored { .. })) => {
                    self.template = parsed;
                }
                _ => tracing::debug!("Role template is not valid JSON, keeping it as-is"),
            }
        }
    }

    /// Validate the template.
    pub fn validate(&self) -> crate::Result<()> {
        match &self.template {
            TemplateSource::Inline { source } if source.trim().is_empty() => {
                Err(crate::Error::validation("Inline role template requires a source"))
            }
            TemplateSource::Stored { id } if id.trim().is_empty() => {
                Err(crate::Error::validation("Stored role template requires a script id"))
            }
            TemplateSource::Invalid(_) => Err(crate::Error::validation("Role template is invalid")),
            _ => Ok(()),
        }
    }
}

/// The source of a role template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSource {
    /// Inline mustache source
    Inline {
        /// Template source
        source: String,
    },
    /// Reference to a stored script
    Stored {
        /// Script id
        id: String,
    },
    /// A template that is neither inline nor stored
    Invalid(String),
}

/// How the output of a role template is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    /// A single role name
    String,
    /// A JSON array of role names
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_shapes() {
        let inline: RoleTemplate =
            serde_json::from_value(json!({ "template": { "source": "{{username}}" } })).unwrap();
        assert_eq!(inline, RoleTemplate::inline("{{username}}"));

        let stored: RoleTemplate = serde_json::from_value(json!({
            "template": { "id": "roles-script" },
            "format": "json"
        }))
        .unwrap();
        assert_eq!(stored, RoleTemplate::stored("roles-script").with_format(TemplateFormat::Json));

        let invalid: RoleTemplate =
            serde_json::from_value(json!({ "template": "not a template" })).unwrap();
        assert!(invalid.is_invalid());
    }

    #[test]
    fn test_normalize_stringified_template() {
        let mut template: RoleTemplate = serde_json::from_value(json!({
            "template": "{\"source\":\"{{#tojson}}groups{{/tojson}}\"}",
            "format": "json"
        }))
        .unwrap();
        assert!(template.is_invalid());

        template.normalize();
        assert_eq!(
            template.template,
            TemplateSource::Inline {
                source: "{{#tojson}}groups{{/tojson}}".to_string()
            }
        );
        assert_eq!(template.format, Some(TemplateFormat::Json));
    }

    #[test]
    fn test_normalize_keeps_unparseable_strings() {
        let mut template: RoleTemplate =
            serde_json::from_value(json!({ "template": "{{username}}" })).unwrap();
        template.normalize();
        assert!(template.is_invalid());
    }

    #[test]
    fn test_validation() {
        assert!(RoleTemplate::inline("{{username}}").validate().is_ok());
        assert!(RoleTemplate::inline("  ").validate().is_err());
        assert!(RoleTemplate::stored("").validate().is_err());

        let invalid = RoleTemplate {
            template: TemplateSource::Invalid("x".to_string()),
            format: None,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_serialization_skips_missing_format() {
        let value = serde_json::to_value(RoleTemplate::stored("s")).unwrap();
        assert_eq!(value, json!({ "template": { "id": "s" } }));
    }
}
