//! Minimal CLI: catalogue → (resolve | tree)
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

use crate::config::GenerationConfig;
use crate::context::{ContextId, ContextTree};
use crate::emit::{self, ManifestEmitter};
use crate::spec::Specification;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// resolve a catalogue of remote API descriptors into namespaced units and typed declarations
#[derive(Parser, Debug)]
#[command(name = "stubgraph", version)]
pub struct CommandLineInterface {
    /// tracing filter used when RUST_LOG is unset (e.g. `debug`, `stubgraph=trace`)
    #[arg(long, global = true, default_value = "stubgraph=info")]
    pub log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve the catalogue and write the unit manifests (or print them)
    Resolve(ResolveOut),
    /// print the namespace tree built from the catalogue
    Tree(TreeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the catalogue inside each document (e.g. /data/specs)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct GenerationSettings {
    /// JSON file with generation settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// namespace every generated unit lives under
    #[arg(long)]
    base_namespace: Option<String>,

    /// only keep descriptors under this context (repeatable)
    #[arg(long = "context")]
    contexts: Vec<String>,

    /// only keep functions with this id (repeatable)
    #[arg(long = "function-id")]
    function_ids: Vec<String>,

    /// skip client functions written in another language
    #[arg(long)]
    client_language: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct ResolveOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generation: GenerationSettings,

    /// output directory for unit manifests (whole output as JSON on stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// replace manifests that already exist
    #[arg(long)]
    overwrite: bool,
}

#[derive(clap::Parser, Debug)]
struct TreeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generation: GenerationSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_specifications(&self) -> Result<Vec<Specification>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut specs = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let mut document = serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            if let Some(pointer) = self.json_pointer.as_ref() {
                document = document
                    .pointer(pointer)
                    .cloned()
                    .with_context(|| format!("JSON pointer {pointer} selects nothing in {source_path_str}"))?;
            }
            let documents = match self.jq_expr.as_ref() {
                None => vec![document],
                Some(jq_expr) => crate::jq_exec::prefilter(jq_expr, &document).with_context(|| {
                    format!("failed to apply jq expression to source file ({source_path_str})")
                })?,
            };
            for document in documents {
                let decoded = crate::decode::decode_catalogue(document)
                    .with_context(|| format!("invalid catalogue in {source_path_str}"))?;
                tracing::debug!(path = %source_path_str, descriptors = decoded.len(), "loaded catalogue");
                specs.extend(decoded);
            }
        }
        Ok(specs)
    }
}

impl GenerationSettings {
    fn load_config(&self) -> Result<GenerationConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => GenerationConfig::load(path)?,
            None => GenerationConfig::default(),
        };
        if let Some(base_namespace) = self.base_namespace.as_ref() {
            config.base_namespace = base_namespace.clone();
        }
        if !self.contexts.is_empty() {
            config.context_filters = self.contexts.clone();
        }
        if !self.function_ids.is_empty() {
            config.function_ids = self.function_ids.clone();
        }
        if self.client_language.is_some() {
            config.client_language = self.client_language.clone();
        }
        Ok(config)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Resolve(target) => {
                let mut config = target.generation.load_config()?;
                config.overwrite |= target.overwrite;
                let specs = target.input_settings.load_specifications()?;
                let output = crate::generate(specs, &config)?;

                let Some(out) = target.out.as_ref() else {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                    return Ok(());
                };
                let mut emitter = ManifestEmitter::new(out, config.overwrite);
                emit::emit_all(&output, &mut emitter)?;
                eprintln!(
                    "{} {} units, {} types ({} kept, {} skipped descriptors) → {}",
                    "resolved".green().bold(),
                    output.specifications().len(),
                    output.types.len(),
                    emitter.kept().len(),
                    output.skipped.len(),
                    out.display(),
                );
                for skipped in &output.skipped {
                    eprintln!("  {} {} ({}): {}", "skipped".yellow(), skipped.name, skipped.id, skipped.reason);
                }
            }
            Command::Tree(target) => {
                let config = target.generation.load_config()?;
                let specs = target.input_settings.load_specifications()?;
                let mut functions = ContextTree::new(&config.function_root, &config.base_namespace);
                let mut variables = ContextTree::new(&config.variable_root, &config.base_namespace);
                for spec in specs {
                    if config.exclusion_reason(&spec).is_some() {
                        continue;
                    }
                    if spec.is_variable() {
                        variables.insert(spec);
                    } else {
                        functions.insert(spec);
                    }
                }
                if functions.is_empty() && variables.is_empty() {
                    bail!("no descriptors left after filtering");
                }
                for tree in [&functions, &variables] {
                    if !tree.is_empty() {
                        print_tree(tree, tree.root(), 0);
                    }
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_tree(tree: &ContextTree, id: ContextId, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} {}", tree.unit_name(id).bold(), tree.namespace(id).dimmed());
    for spec in tree.specifications(id) {
        println!("{indent}  · {} {}", spec.name, format!("[{}]", spec.kind_label()).cyan());
    }
    for child in tree.children(id) {
        print_tree(tree, child, depth + 1);
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern)? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }

    Ok(out)
}
