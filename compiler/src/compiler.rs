use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    backend::{Backend, CodegenOptions},
    error::KprotoError,
    parser::{parse_schema, ParseOptions},
    types::FileDesc,
};

/// Parse and verify schema text, failing on any diagnostic.
pub fn compile_schema(file_name: &str, text: &str, options: &ParseOptions) -> Result<FileDesc, KprotoError> {
    parse_schema(file_name, text, options).into_result()
}

/// Read a schema from disk and parse it. Diagnostics are labelled with the
/// path as given.
pub fn load_schema(path: &Path, options: &ParseOptions) -> Result<FileDesc, KprotoError> {
    let text = fs::read_to_string(path)?;
    compile_schema(&path.display().to_string(), &text, options)
}

/// Select the backend's package and generate its source for `file`.
pub fn generate_source(
    backend: &dyn Backend,
    mut file: FileDesc,
    options: &CodegenOptions,
) -> Result<String, KprotoError> {
    let package = file.select_package(backend.lang()).map(str::to_string);
    info!(lang = backend.lang(), package = ?package, "generating source");
    backend.generate(&file, options)
}

/// Parse `text` and generate source with `backend` in one step.
pub fn compile_to_source(
    backend: &dyn Backend,
    file_name: &str,
    text: &str,
    parse_options: &ParseOptions,
    codegen_options: &CodegenOptions,
) -> Result<String, KprotoError> {
    let file = compile_schema(file_name, text, parse_options)?;
    generate_source(backend, file, codegen_options)
}

/// Where generated source goes by default: the schema path with the
/// backend's extension appended, e.g. `login.kproto.go`.
pub fn default_output_path(schema: &Path, backend: &dyn Backend) -> PathBuf {
    let mut name = schema.as_os_str().to_os_string();
    name.push(".");
    name.push(backend.file_extension());
    PathBuf::from(name)
}
