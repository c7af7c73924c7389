//! kproto
//!
//! Runtime support for code generated from `.kproto` schemas, plus the
//! compiler entry points for tools that generate code themselves.
//!
//! - The wire codec (`ByteWriter`, `ByteReader`, `Message`, ...) re-exported
//!   from `kproto-wire`, which generated Rust code imports as `kproto::...`
//! - `compile` and `descriptor_to_json` helpers over `kproto-compiler`

pub use kproto_compiler::error::KprotoError;
pub use kproto_compiler::types::FileDesc;
pub use kproto_wire::{
    ByteOrder, ByteReader, ByteWriter, CodecError, Message, WireConfig, LENGTH_PREFIX_SIZE, MAX_LENGTH,
};

use kproto_compiler::{compile_schema, generate_source, BackendRegistry, CodegenOptions, ParseOptions};

/// Parse a schema and render its descriptor model as pretty-printed JSON.
pub fn descriptor_to_json(file_name: &str, text: &str) -> Result<String, KprotoError> {
    let file = compile_schema(file_name, text, &ParseOptions::default())?;
    file_to_json(&file)
}

/// Render an already parsed descriptor model as pretty-printed JSON.
pub fn file_to_json(file: &FileDesc) -> Result<String, KprotoError> {
    Ok(serde_json::to_string_pretty(file)?)
}

/// Compile schema text with one of the built-in backends.
pub fn compile(file_name: &str, text: &str, lang: &str, options: &CodegenOptions) -> Result<String, KprotoError> {
    let registry = BackendRegistry::with_defaults();
    let backend = registry.require(lang)?;
    let file = compile_schema(file_name, text, &ParseOptions::default())?;
    generate_source(backend, file, options)
}

pub mod wire {
    pub use kproto_wire::*;
}

pub mod compiler {
    pub use kproto_compiler::*;
}

pub mod error {
    pub use kproto_compiler::error::KprotoError;
    pub use kproto_wire::CodecError;
}
