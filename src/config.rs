use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::split_context;
use crate::error::{Error, Result};
use crate::spec::{Specification, SpecificationKind};

/// Knobs of one generation run. Loadable from a JSON file; every field has a
/// default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Namespace every generated unit and type lives under.
    pub base_namespace: String,
    /// Root unit for functions and webhooks.
    pub function_root: String,
    /// Root unit for server variables.
    pub variable_root: String,
    /// Keep only descriptors whose context equals or sits below one of these.
    pub context_filters: Vec<String>,
    /// Keep only functions with these ids. Variables and webhooks are unaffected.
    pub function_ids: Vec<String>,
    /// Client functions declared in another language are skipped.
    pub client_language: Option<String>,
    /// Emitters replace existing files instead of skipping them.
    pub overwrite: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_namespace: "io.poly".to_owned(),
            function_root: "Poly".to_owned(),
            variable_root: "Vari".to_owned(),
            context_filters: Vec::new(),
            function_ids: Vec::new(),
            client_language: None,
            overwrite: false,
        }
    }
}

impl GenerationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_owned(), source })?;
        crate::decode::from_str_with_path::<Self>(&source).map_err(|message| Error::Decode {
            path: path.display().to_string(),
            message,
        })
    }

    /// Why `spec` is left out of the run, or `None` if it takes part.
    pub fn exclusion_reason(&self, spec: &Specification) -> Option<String> {
        if let SpecificationKind::Ignored { reason, .. } = &spec.kind {
            return Some(reason.clone());
        }
        if !self.context_filters.is_empty() && !self.context_filters.iter().any(|filter| context_matches(filter, &spec.context)) {
            return Some(format!("context `{}` is outside the configured filters", spec.context));
        }
        let is_function = !matches!(
            spec.kind,
            SpecificationKind::ServerVariable { .. } | SpecificationKind::WebhookHandle { .. }
        );
        if is_function && !self.function_ids.is_empty() && !self.function_ids.contains(&spec.id) {
            return Some("function id not selected".to_owned());
        }
        if let (SpecificationKind::ClientFunction { language: Some(language), .. }, Some(target)) =
            (&spec.kind, &self.client_language)
        {
            if !language.eq_ignore_ascii_case(target) {
                return Some(format!("client function written in `{language}`"));
            }
        }
        None
    }
}

/// Segment-wise, case-insensitive prefix match: `a.b` matches `a.b` and
/// `a.b.c` but not `a.bc`.
fn context_matches(filter: &str, context: &str) -> bool {
    let mut context = split_context(context);
    split_context(filter).all(|segment| {
        context
            .next()
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(segment))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: &str, id: &str, context: &str) -> Specification {
        serde_json::from_value(json!({
            "id": id,
            "type": kind,
            "context": context,
            "name": id,
            "function": {},
            "variable": {},
            "language": "python",
        }))
        .unwrap()
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config: GenerationConfig = serde_json::from_value(json!({"baseNamespace": "com.acme"})).unwrap();
        assert_eq!(config.base_namespace, "com.acme");
        assert_eq!(config.function_root, "Poly");
        assert_eq!(config.variable_root, "Vari");
    }

    #[test]
    fn context_filters_match_whole_segments() {
        let config = GenerationConfig { context_filters: vec!["Shipping.rates".into()], ..Default::default() };
        assert!(config.exclusion_reason(&spec("serverFunction", "a", "shipping.rates")).is_none());
        assert!(config.exclusion_reason(&spec("serverFunction", "b", "shipping.rates.intl")).is_none());
        assert!(config.exclusion_reason(&spec("serverFunction", "c", "shipping.ratesx")).is_some());
        assert!(config.exclusion_reason(&spec("serverFunction", "d", "")).is_some());
    }

    #[test]
    fn function_ids_leave_variables_alone() {
        let config = GenerationConfig { function_ids: vec!["keep".into()], ..Default::default() };
        assert!(config.exclusion_reason(&spec("serverFunction", "keep", "")).is_none());
        assert!(config.exclusion_reason(&spec("apiFunction", "drop", "")).is_some());
        assert!(config.exclusion_reason(&spec("serverVariable", "var", "")).is_none());
        assert!(config.exclusion_reason(&spec("webhookHandle", "hook", "")).is_none());
    }

    #[test]
    fn client_language_filter() {
        let config = GenerationConfig { client_language: Some("java".into()), ..Default::default() };
        assert!(config.exclusion_reason(&spec("customFunction", "x", "")).is_some());
        let config = GenerationConfig { client_language: Some("Python".into()), ..Default::default() };
        assert!(config.exclusion_reason(&spec("customFunction", "x", "")).is_none());
    }

    #[test]
    fn ignored_descriptors_are_excluded() {
        let config = GenerationConfig::default();
        assert!(config.exclusion_reason(&spec("mystery", "x", "")).is_some());
    }
}
