//! kproto-compiler
//!
//! This crate implements:
//!  1) A line classifier + tolerant parser for `.kproto` schema files that
//!     collects every diagnostic in one pass,
//!  2) A verifier (unresolved types, self references, type cycles, sizes),
//!  3) The descriptor model (`FileDesc` and friends) with `max_size`,
//!  4) The codegen backend contract plus `go` and `rust` backends,
//!  5) Error types (`KprotoError`, `Diagnostic`).
//!
//! ```
//! use kproto_compiler::{compile_schema, ParseOptions};
//!
//! let text = "message Point:7\n  X int32\n  Y int32\n  Label string:16\n";
//! let file = compile_schema("point.kproto", text, &ParseOptions::default()).unwrap();
//! assert_eq!(file.messages[0].id, 7);
//! assert_eq!(file.max_size("Point"), Ok(4 + 4 + 18));
//! ```

pub mod backend;
pub mod compiler;
pub mod error;
pub mod gen_go;
pub mod gen_rust;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod utils;
pub mod verifier;

pub use backend::{Backend, BackendRegistry, CodegenOptions, FieldDispatch, FieldFragments};
pub use compiler::{compile_schema, compile_to_source, default_output_path, generate_source, load_schema};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, KprotoError, ParseFailure, SemanticError};
pub use gen_go::{compile_file_to_go, GoBackend};
pub use gen_rust::{compile_file_to_rust, RustBackend};
pub use parser::{parse_schema, ParseOptions, ParseOutput};
pub use types::{FieldDesc, FieldType, FileDesc, MessageDesc, MethodDesc, PackageDesc, Primitive, RpcDesc};
