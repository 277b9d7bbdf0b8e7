//! User prompt rendering
//!
//! User prompts are Jinja templates. Rendering places `feature` (and `k`
//! when the prompt defines one) in the context; everything else the template
//! language offers, such as filters and conditionals, is available as-is.
//!

use std::collections::BTreeMap;

use minijinja::{Environment, Value};

pub use apprank_utils::error::TemplateError;
pub use apprank_utils::types::FeatureCasing;

/// Renders user prompts with a fixed feature-casing policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptRenderer {
    casing: FeatureCasing,
}

impl PromptRenderer {
    #[must_use]
    pub fn new(casing: FeatureCasing) -> Self {
        Self { casing }
    }

    #[must_use]
    pub fn casing(&self) -> FeatureCasing {
        self.casing
    }

    /// Render `template` for one feature.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` on syntax errors or failing filters.
    pub fn render(
        &self,
        template: &str,
        feature: &str,
        k: Option<i64>,
    ) -> Result<String, TemplateError> {
        let env = environment();
        let compiled = env.template_from_str(template).map_err(render_error)?;

        let mut context: BTreeMap<&str, Value> = BTreeMap::new();
        context.insert("feature", Value::from(apply_casing(feature, self.casing)));
        if let Some(k) = k {
            context.insert("k", Value::from(k));
        }

        compiled.render(context).map_err(render_error)
    }
}

/// Render with the default casing policy (first letter lowered).
pub fn render(template: &str, feature: &str, k: Option<i64>) -> Result<String, TemplateError> {
    PromptRenderer::default().render(template, feature, k)
}

/// Check that `template` parses, without rendering it.
pub fn validate(template: &str) -> Result<(), TemplateError> {
    environment()
        .template_from_str(template)
        .map(|_| ())
        .map_err(render_error)
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(false);
    env
}

fn render_error(err: minijinja::Error) -> TemplateError {
    TemplateError::Render {
        reason: err.to_string(),
    }
}

fn apply_casing(feature: &str, casing: FeatureCasing) -> String {
    match casing {
        FeatureCasing::Preserve => feature.to_string(),
        FeatureCasing::LowercaseFirst => {
            let mut chars = feature.chars();
            match chars.next() {
                Some(first) if first.is_uppercase() => {
                    first.to_lowercase().chain(chars).collect()
                }
                _ => feature.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_capital_is_lowered() {
        assert_eq!(
            render("Analyze {{feature}}", "Search", None).unwrap(),
            "Analyze search"
        );
    }

    #[test]
    fn only_the_first_character_changes() {
        assert_eq!(
            render("{{ feature }}", "Offline Maps", None).unwrap(),
            "offline Maps"
        );
        assert_eq!(render("{{ feature }}", "eBay", None).unwrap(), "eBay");
    }

    #[test]
    fn preserve_policy_keeps_the_name() {
        let renderer = PromptRenderer::new(FeatureCasing::Preserve);
        assert_eq!(
            renderer.render("Analyze {{feature}}", "Search", None).unwrap(),
            "Analyze Search"
        );
    }

    #[test]
    fn k_is_substituted_when_present() {
        let text = "List the top {{ k }} apps for {{ feature }}";
        assert_eq!(
            render(text, "Search", Some(5)).unwrap(),
            "List the top 5 apps for search"
        );
    }

    #[test]
    fn conditionals_see_missing_k_as_undefined() {
        let text = "{% if k %}Top {{ k }}{% else %}All{% endif %} apps for {{ feature }}";
        assert_eq!(render(text, "Chat", None).unwrap(), "All apps for chat");
        assert_eq!(render(text, "Chat", Some(3)).unwrap(), "Top 3 apps for chat");
    }

    #[test]
    fn filters_apply_after_casing() {
        assert_eq!(
            render("{{ feature | upper }}", "Search", None).unwrap(),
            "SEARCH"
        );
    }

    #[test]
    fn syntax_errors_are_render_errors() {
        let err = render("Analyze {{ feature ", "Search", None).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
        assert!(validate("{% if %}").is_err());
        assert!(validate("Analyze {{ feature }}").is_ok());
    }

    #[test]
    fn empty_feature_is_left_alone() {
        assert_eq!(render("[{{ feature }}]", "", None).unwrap(), "[]");
    }
}
