use std::fmt;

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::error::{Error, Result};

/// Absolute location of a node, as unescaped segments from the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer(Vec<String>);

impl Pointer {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(root, |node, segment| step(node, segment))
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

/// Follows a `$ref` string found at `current`.
///
/// Anything before `#` names the containing document and is ignored; a `#`
/// restarts at the document root, otherwise segments are taken relative to
/// `current`. Each segment is percent-decoded then JSON-pointer unescaped.
pub fn dereference(root: &Value, current: &Pointer, reference: &str) -> Result<Pointer> {
    let (mut target, fragment) = match reference.find('#') {
        Some(index) => (Pointer::root(), &reference[index + 1..]),
        None => (current.clone(), reference),
    };
    let mut node = target
        .resolve(root)
        .ok_or_else(|| Error::unresolved(reference, format!("base location `{target}` is gone")))?;
    for raw in fragment.split('/').filter(|segment| !segment.is_empty()) {
        let segment = unescape(&percent_decode_str(raw).decode_utf8_lossy());
        node = step(node, &segment).ok_or_else(|| {
            Error::unresolved(reference, format!("segment `{segment}` not found under `{target}`"))
        })?;
        target.0.push(segment);
    }
    Ok(target)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn step<'v>(node: &'v Value, segment: &str) -> Option<&'v Value> {
    match node {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
