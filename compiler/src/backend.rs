use std::collections::BTreeMap;

use crate::{
    error::KprotoError,
    gen_go::GoBackend,
    gen_rust::RustBackend,
    types::{FieldDesc, FieldType, FileDesc, Primitive},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Leave out the service interfaces generated from `rpc` blocks.
    pub skip_rpc: bool,
    /// Import path of the runtime codec; each backend has its own default.
    pub runtime:  Option<String>,
}

impl CodegenOptions {
    pub fn runtime_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.runtime.as_deref().unwrap_or(default)
    }
}

/// The statements that encode one field and the code that decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFragments {
    pub encode: String,
    pub decode: String,
}

/// Maps each field to its encode/decode fragments. The primitive arm must
/// follow the wire codec exactly; every other type is a nested message.
pub trait FieldDispatch {
    fn primitive(&self, field: &FieldDesc, primitive: Primitive, is_array: bool) -> FieldFragments;

    fn message(&self, field: &FieldDesc, type_name: &str, is_array: bool) -> FieldFragments;

    fn dispatch(&self, field: &FieldDesc) -> FieldFragments {
        match &field.ty {
            FieldType::Primitive(primitive) => self.primitive(field, *primitive, field.is_array()),
            FieldType::Message(name) => self.message(field, name, field.is_array()),
        }
    }
}

/// A code generator for one target language.
pub trait Backend {
    /// Language tag matched against `package <lang>` declarations.
    fn lang(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    /// Emit the source for a verified file. `file.package_name` must already
    /// be selected for this backend's language.
    fn generate(&self, file: &FileDesc, options: &CodegenOptions) -> Result<String, KprotoError>;
}

/// Backends available to a driver, keyed by language tag.
#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<&'static str, Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the `go` and `rust` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GoBackend));
        registry.register(Box::new(RustBackend));
        registry
    }

    /// Add a backend, replacing any previous one with the same tag.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.insert(backend.lang(), backend);
    }

    pub fn get(&self, lang: &str) -> Option<&dyn Backend> {
        self.backends.get(lang).map(|b| b.as_ref())
    }

    /// Registered language tags in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }

    /// Look up `lang`, failing with the list of known tags.
    pub fn require(&self, lang: &str) -> Result<&dyn Backend, KprotoError> {
        self.get(lang).ok_or_else(|| KprotoError::UnknownBackend {
            lang:      lang.to_string(),
            available: self.names().join(", "),
        })
    }
}

/// Indent every non-empty line of `text` by `level` steps of four spaces.
pub(crate) fn indent(text: &str, level: usize) -> String {
    indent_with(text, &"    ".repeat(level))
}

pub(crate) fn indent_with(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("{}{}", prefix, line) })
        .collect::<Vec<_>>()
        .join("\n")
}
