//! Hand-off to the text emission step.
//!
//! Rendering target-language source is not this crate's business: an
//! [`Emitter`] receives every resolved unit with its namespace and decides
//! what to write. [`ManifestEmitter`] is the bundled implementation and
//! writes each unit as a JSON document.
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ir::{GenerationOutput, ResolvedContext, ResolvedSpecification, TypeDecl};

pub trait Emitter {
    fn emit_context(&mut self, context: &ResolvedContext) -> Result<()>;
    fn emit_specification(&mut self, spec: &ResolvedSpecification) -> Result<()>;
    fn emit_type(&mut self, decl: &TypeDecl) -> Result<()>;
}

/// Contexts depth first (each followed by its descriptors), then types.
pub fn emit_all<E: Emitter + ?Sized>(output: &GenerationOutput, emitter: &mut E) -> Result<()> {
    fn walk<E: Emitter + ?Sized>(context: &ResolvedContext, emitter: &mut E) -> Result<()> {
        emitter.emit_context(context)?;
        for spec in &context.specifications {
            emitter.emit_specification(spec)?;
        }
        for child in &context.children {
            walk(child, emitter)?;
        }
        Ok(())
    }
    for root in &output.contexts {
        walk(root, emitter)?;
    }
    for decl in &output.types {
        emitter.emit_type(decl)?;
    }
    Ok(())
}

/// Writes `<out>/<namespace as directories>/<Unit>.json`. Existing files are
/// left alone unless `overwrite` is set.
#[derive(Debug)]
pub struct ManifestEmitter {
    out_dir: PathBuf,
    overwrite: bool,
    written: Vec<PathBuf>,
    kept: Vec<PathBuf>,
}

/// Context units list their children and descriptors by qualified name only.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextManifest<'a> {
    name: &'a str,
    namespace: &'a str,
    unit_name: &'a str,
    imports: &'a std::collections::BTreeSet<String>,
    children: Vec<String>,
    specifications: Vec<String>,
}

impl ManifestEmitter {
    pub fn new(out_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self { out_dir: out_dir.into(), overwrite, written: Vec::new(), kept: Vec::new() }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Files that already existed and were not replaced.
    pub fn kept(&self) -> &[PathBuf] {
        &self.kept
    }

    /// Every namespace segment must be a plain file name, so nothing lands
    /// outside `out_dir`.
    pub fn unit_path(&self, namespace: &str, unit_name: &str) -> Result<PathBuf> {
        let file_name = format!("{unit_name}.json");
        let mut path = self.out_dir.clone();
        for segment in namespace.split('.').filter(|segment| !segment.is_empty()) {
            path.push(plain_segment(&self.out_dir, segment)?);
        }
        path.push(plain_segment(&self.out_dir, &file_name)?);
        Ok(path)
    }

    fn write<T: Serialize>(&mut self, namespace: &str, unit_name: &str, model: &T) -> Result<()> {
        let path = self.unit_path(namespace, unit_name)?;
        if path.exists() && !self.overwrite {
            tracing::debug!(path = %path.display(), "keeping existing file");
            self.kept.push(path);
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let text = serde_json::to_string_pretty(model).map_err(|error| Error::Io {
            path: path.clone(),
            source: std::io::Error::other(error),
        })?;
        std::fs::write(&path, text).map_err(|source| io_error(&path, source))?;
        tracing::trace!(path = %path.display(), "wrote unit");
        self.written.push(path);
        Ok(())
    }
}

impl Emitter for ManifestEmitter {
    fn emit_context(&mut self, context: &ResolvedContext) -> Result<()> {
        let manifest = ContextManifest {
            name: &context.name,
            namespace: &context.namespace,
            unit_name: &context.unit_name,
            imports: &context.imports,
            children: context.children.iter().map(|child| child.qualified_name().to_string()).collect(),
            specifications: context
                .specifications
                .iter()
                .map(|spec| spec.qualified_name().to_string())
                .collect(),
        };
        self.write(&context.namespace, &context.unit_name, &manifest)
    }

    fn emit_specification(&mut self, spec: &ResolvedSpecification) -> Result<()> {
        self.write(&spec.namespace, &spec.unit_name, spec)
    }

    fn emit_type(&mut self, decl: &TypeDecl) -> Result<()> {
        self.write(&decl.name.namespace, &decl.name.name, decl)
    }
}

fn plain_segment<'s>(out_dir: &Path, segment: &'s str) -> Result<&'s str> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !segment.contains(['/', '\\']) => Ok(segment),
        _ => Err(io_error(
            out_dir,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("namespace segment `{segment}` is not a plain directory name"),
            ),
        )),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io { path: path.to_owned(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::generate::generate;
    use serde_json::{Value, json};

    fn output() -> GenerationOutput {
        let specs = serde_json::from_value(json!([{
            "id": "1",
            "type": "serverFunction",
            "context": "billing",
            "name": "charge",
            "function": {"returnType": {"kind": "object", "schema": {
                "title": "Receipt", "properties": {"amount": {"type": "number"}},
            }}},
        }]))
        .unwrap();
        generate(specs, &GenerationConfig::default()).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Emitter for Recorder {
        fn emit_context(&mut self, context: &ResolvedContext) -> Result<()> {
            self.0.push(format!("context {}", context.unit_name));
            Ok(())
        }
        fn emit_specification(&mut self, spec: &ResolvedSpecification) -> Result<()> {
            self.0.push(format!("spec {}", spec.unit_name));
            Ok(())
        }
        fn emit_type(&mut self, decl: &TypeDecl) -> Result<()> {
            self.0.push(format!("type {}", decl.name.name));
            Ok(())
        }
    }

    #[test]
    fn emit_all_visits_everything_in_order() {
        let mut recorder = Recorder::default();
        emit_all(&output(), &mut recorder).unwrap();
        assert_eq!(recorder.0, vec!["context Poly", "context Billing", "spec Charge", "type Receipt"]);
    }

    #[test]
    fn manifest_layout_follows_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = ManifestEmitter::new(dir.path(), false);
        emit_all(&output(), &mut emitter).unwrap();
        assert_eq!(emitter.written().len(), 4);
        let receipt = dir.path().join("io/poly/poly/billing/Receipt.json");
        let text = std::fs::read_to_string(receipt).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "object");
        assert_eq!(value["members"][0]["type"], "float");
    }

    #[test]
    fn existing_files_are_kept_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let out = output();
        emit_all(&out, &mut ManifestEmitter::new(dir.path(), false)).unwrap();

        let mut again = ManifestEmitter::new(dir.path(), false);
        emit_all(&out, &mut again).unwrap();
        assert!(again.written().is_empty());
        assert_eq!(again.kept().len(), 4);

        let mut forced = ManifestEmitter::new(dir.path(), true);
        emit_all(&out, &mut forced).unwrap();
        assert_eq!(forced.written().len(), 4);
    }

    #[test]
    fn namespaces_cannot_leave_the_output_directory() {
        let specs = serde_json::from_value(json!([{
            "id": "1",
            "type": "serverFunction",
            "context": "x./stubgraph-outside/.leaf",
            "name": "run",
            "function": {},
        }]))
        .unwrap();
        let out = generate(specs, &GenerationConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = ManifestEmitter::new(dir.path(), false);
        let err = emit_all(&out, &mut emitter).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(emitter.written().iter().all(|path| path.starts_with(dir.path())));
        assert!(!Path::new("/stubgraph-outside").exists());

        assert!(emitter.unit_path("io.poly", "../Run").is_err());
        assert!(emitter.unit_path("io..poly", "Run").is_ok());
        assert!(emitter.unit_path("io.poly", "Run").unwrap().starts_with(dir.path()));
    }
}
