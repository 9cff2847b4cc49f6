//! Resolves a flat catalogue of remotely defined functions, variables and
//! webhooks into a namespace tree of generated units plus the deduplicated,
//! name-stable type declarations those units reference.
//!
//! ```no_run
//! let specs = stubgraph::decode::decode_catalogue_str("[]")?;
//! let output = stubgraph::generate(specs, &stubgraph::GenerationConfig::default())?;
//! assert!(output.types.is_empty());
//! # Ok::<(), stubgraph::Error>(())
//! ```
pub mod assemble;
pub mod cli;
pub mod config;
pub mod context;
pub mod decode;
pub mod emit;
pub mod error;
pub mod generate;
pub mod imports;
pub mod ir;
pub mod jq_exec;
pub mod naming;
pub mod property;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod spec;

pub use config::GenerationConfig;
pub use error::{Error, Result};
pub use generate::generate;
pub use ir::{GenerationOutput, ResolvedContext, ResolvedSpecification, ResolvedType, TypeDecl, TypeRef};
pub use resolve::{ResolutionContext, TypeExtractor};
pub use spec::Specification;
