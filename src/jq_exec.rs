//! jq pre-filtering of catalogue documents before they are decoded.
use anyhow::{Context, Result, anyhow};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

/// Runs `filter_src` over `document` and returns every output value.
/// Each output is decoded separately, so a filter like `.items[]` yields one
/// descriptor per output.
pub fn prefilter(filter_src: &str, document: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(format_parse_errors)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(document.clone())));

    let mut values = Vec::new();
    for (index, item) in outputs.enumerate() {
        let item = item.map_err(|error| anyhow!("jq runtime error: {error:?}"))?;
        // Val renders as JSON text
        let value = serde_json::from_str::<Value>(&item.to_string())
            .with_context(|| format!("jq output #{index} is not JSON"))?;
        values.push(value);
    }
    tracing::debug!(filter = filter_src, outputs = values.len(), "applied jq filter");
    Ok(values)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let report: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect();
    anyhow!(report.join("\n"))
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let report: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("undefined `{name}`: {undef:?} in `{}`", file.code))
        })
        .collect();
    anyhow!(report.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_nested_catalogue() {
        let document = json!({"data": {"specs": [{"name": "a"}, {"name": "b"}]}});
        let outputs = prefilter(".data.specs", &document).unwrap();
        assert_eq!(outputs, vec![json!([{"name": "a"}, {"name": "b"}])]);
    }

    #[test]
    fn streams_multiple_outputs() {
        let document = json!([{"type": "serverFunction"}, {"type": "apiFunction"}]);
        let outputs = prefilter(r#".[] | select(.type == "apiFunction")"#, &document).unwrap();
        assert_eq!(outputs, vec![json!({"type": "apiFunction"})]);
    }

    #[test]
    fn bad_filters_are_reported() {
        assert!(prefilter(".[", &json!([])).is_err());
        assert!(prefilter("no_such_function", &json!([])).is_err());
    }
}
