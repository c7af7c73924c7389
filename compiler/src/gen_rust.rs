use std::collections::hash_map::{Entry, HashMap};
use tracing::{debug, info};

use crate::{
    backend::{indent, Backend, CodegenOptions, FieldDispatch, FieldFragments},
    error::KprotoError,
    types::{FieldDesc, FieldType, FileDesc, MessageDesc, Primitive, RpcDesc},
    utils::{escape_rust_keyword, is_rust_identifier, quote, to_pascal_case, to_screaming_snake_case, to_snake_case},
};

/// Crate path generated code imports the codec from unless overridden.
pub const DEFAULT_RUNTIME: &str = "kproto";

/// Type names the generated file imports or takes from the prelude.
const RESERVED_TYPES: [&str; 7] = ["ByteReader", "ByteWriter", "CodecError", "Message", "Result", "String", "Vec"];

/// Emits Rust structs implementing `kproto::Message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn lang(&self) -> &'static str {
        "rust"
    }

    fn file_extension(&self) -> &'static str {
        "rs"
    }

    fn generate(&self, file: &FileDesc, options: &CodegenOptions) -> Result<String, KprotoError> {
        compile_file_to_rust(file, options)
    }
}

/// Method suffix of the writer/reader calls for a primitive.
fn wire_name(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "bool",
        Primitive::Byte => "byte",
        Primitive::Int8 => "i8",
        Primitive::Uint8 => "u8",
        Primitive::Int16 => "i16",
        Primitive::Uint16 => "u16",
        Primitive::Int32 => "i32",
        Primitive::Uint32 => "u32",
        Primitive::Int64 => "i64",
        Primitive::Uint64 => "u64",
        Primitive::Float32 => "f32",
        Primitive::Float64 => "f64",
        Primitive::String => "string",
    }
}

fn map_primitive(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "bool",
        Primitive::Byte | Primitive::Uint8 => "u8",
        Primitive::Int8 => "i8",
        Primitive::Int16 => "i16",
        Primitive::Uint16 => "u16",
        Primitive::Int32 => "i32",
        Primitive::Uint32 => "u32",
        Primitive::Int64 => "i64",
        Primitive::Uint64 => "u64",
        Primitive::Float32 => "f32",
        Primitive::Float64 => "f64",
        Primitive::String => "String",
    }
}

fn map_type(field: &FieldDesc) -> String {
    let base = match &field.ty {
        FieldType::Primitive(primitive) => map_primitive(*primitive).to_string(),
        FieldType::Message(name) => type_ident(name),
    };
    if field.is_array() {
        format!("Vec<{}>", base)
    } else {
        base
    }
}

fn type_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

fn field_ident(field: &FieldDesc) -> String {
    escape_rust_keyword(&to_snake_case(&field.name))
}

fn id_const(message: &MessageDesc) -> String {
    format!("{}_ID", to_screaming_snake_case(&message.name))
}

fn method_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

fn service_name(rpc: &RpcDesc) -> String {
    let name = type_ident(&rpc.name);
    if name.ends_with("Service") {
        name
    } else {
        format!("{}Service", name)
    }
}

impl FieldDispatch for RustBackend {
    fn primitive(&self, field: &FieldDesc, primitive: Primitive, is_array: bool) -> FieldFragments {
        let ident = field_ident(field);
        let name = wire_name(primitive);
        if is_array {
            FieldFragments {
                encode: format!("w.write_{}_array(&self.{})?;", name, ident),
                decode: format!("r.read_{}_array()?", name),
            }
        } else if primitive == Primitive::String {
            FieldFragments {
                encode: format!("w.write_string(&self.{})?;", ident),
                decode: "r.read_string()?".to_string(),
            }
        } else {
            FieldFragments {
                encode: format!("w.write_{}(self.{})?;", name, ident),
                decode: format!("r.read_{}()?", name),
            }
        }
    }

    fn message(&self, field: &FieldDesc, type_name: &str, is_array: bool) -> FieldFragments {
        let ident = field_ident(field);
        let ty = type_ident(type_name);
        if is_array {
            FieldFragments {
                encode: format!(
                    "w.write_length(self.{0}.len())?;\nfor item in &self.{0} {{\n    item.write(w)?;\n}}",
                    ident
                ),
                decode: format!(
                    "{{\n    let len = r.read_length()?;\n    let mut items = Vec::with_capacity(len.min(r.remaining()));\n    for _ in 0..len {{\n        items.push({}::read(r)?);\n    }}\n    items\n}}",
                    ty
                ),
            }
        } else {
            FieldFragments {
                encode: format!("self.{}.write(w)?;", ident),
                decode: format!("{}::read(r)?", ty),
            }
        }
    }
}

/// Compiles a verified file into Rust source. Every message gets an
/// `<NAME>_ID` constant, a struct and a `Message` impl; every rpc becomes a
/// `<Name>Service` trait unless `skip_rpc` is set.
pub fn compile_file_to_rust(file: &FileDesc, options: &CodegenOptions) -> Result<String, KprotoError> {
    check_names(file, options)?;
    let backend = RustBackend;
    let mut items: Vec<String> = Vec::new();

    if !file.messages.is_empty() {
        items.push(format!(
            "use {}::{{ByteReader, ByteWriter, CodecError, Message}};",
            options.runtime_or(DEFAULT_RUNTIME)
        ));
        let consts: Vec<String> = file
            .messages
            .iter()
            .map(|m| format!("pub const {}: u16 = {};", id_const(m), m.id))
            .collect();
        items.push(consts.join("\n"));
    }

    for message in &file.messages {
        debug!(message = %message.name, "emitting rust message");
        let max_size = file.max_size(&message.name)?;
        items.push(generate_struct(message));
        items.push(generate_message_impl(&backend, message, max_size));
    }

    if !options.skip_rpc {
        for rpc in &file.rpcs {
            items.push(generate_service(rpc));
        }
    }

    let body = items.join("\n\n");
    let mut rust_code: Vec<String> = vec![
        format!("// Code generated by kprotoc from {}. DO NOT EDIT.", file.file_name),
        String::new(),
    ];
    match &file.package_name {
        Some(name) => {
            rust_code.push(format!("pub mod {} {{", escape_rust_keyword(&to_snake_case(name))));
            rust_code.push(indent(&body, 1));
            rust_code.push("}".to_string());
        }
        None => rust_code.push(body),
    }

    info!(file = %file.file_name, messages = file.messages.len(), "generated rust source");
    Ok(rust_code.join("\n") + "\n")
}

fn codegen_error(msg: String) -> KprotoError {
    KprotoError::Codegen {
        lang: "rust".to_string(),
        msg,
    }
}

/// Records that `what` is emitted as `ident`, failing when `ident` is not a
/// usable identifier or is already taken.
fn claim(seen: &mut HashMap<String, String>, ident: String, what: String) -> Result<(), KprotoError> {
    if !is_rust_identifier(&ident) {
        return Err(codegen_error(format!("{} has no valid Rust name (got {})", what, quote(&ident))));
    }
    match seen.entry(ident) {
        Entry::Occupied(entry) => Err(codegen_error(format!(
            "{} and {} both become {}",
            entry.get(),
            what,
            quote(entry.key())
        ))),
        Entry::Vacant(entry) => {
            entry.insert(what);
            Ok(())
        }
    }
}

/// Rejects schemas whose names collide once converted to Rust identifiers,
/// either with each other or with the names the generated code uses.
fn check_names(file: &FileDesc, options: &CodegenOptions) -> Result<(), KprotoError> {
    let mut types: HashMap<String, String> = HashMap::new();
    let mut consts: HashMap<String, String> = HashMap::new();
    let mut claim_type = |ident: String, what: String| {
        if RESERVED_TYPES.contains(&ident.as_str()) {
            return Err(codegen_error(format!(
                "{} becomes {}, which the generated code already uses",
                what,
                quote(&ident)
            )));
        }
        claim(&mut types, ident, what)
    };

    for message in &file.messages {
        let what = format!("message {}", quote(&message.name));
        claim_type(type_ident(&message.name), what.clone())?;
        claim(&mut consts, id_const(message), what)?;

        let mut fields = HashMap::new();
        for field in &message.fields {
            let what = format!("field {} of message {}", quote(&field.name), quote(&message.name));
            claim(&mut fields, field_ident(field), what)?;
        }
    }

    if !options.skip_rpc {
        for rpc in &file.rpcs {
            claim_type(service_name(rpc), format!("rpc {}", quote(&rpc.name)))?;

            let mut methods = HashMap::new();
            for method in &rpc.methods {
                let what = format!("method {} of rpc {}", quote(&method.name), quote(&rpc.name));
                claim(&mut methods, method_ident(&method.name), what)?;
            }
        }
    }
    Ok(())
}

fn generate_struct(message: &MessageDesc) -> String {
    let name = type_ident(&message.name);
    let derived = "#[derive(Debug, Clone, PartialEq, Default)]";
    if message.fields.is_empty() {
        return format!("{}\npub struct {} {{}}", derived, name);
    }

    let fields: Vec<String> = message
        .fields
        .iter()
        .map(|f| format!("    pub {}: {},", field_ident(f), map_type(f)))
        .collect();
    format!("{}\npub struct {} {{\n{}\n}}", derived, name, fields.join("\n"))
}

fn generate_message_impl(backend: &RustBackend, message: &MessageDesc, max_size: usize) -> String {
    let name = type_ident(&message.name);
    let fragments: Vec<(String, FieldFragments)> = message
        .fields
        .iter()
        .map(|f| (field_ident(f), backend.dispatch(f)))
        .collect();

    let mut code = vec![
        format!("impl Message for {} {{", name),
        format!("    const ID: u16 = {};", id_const(message)),
        format!("    const MAX_SIZE: usize = {};", max_size),
        String::new(),
    ];

    if fragments.is_empty() {
        code.push("    fn write(&self, _w: &mut ByteWriter<'_>) -> Result<(), CodecError> {".to_string());
    } else {
        code.push("    fn write(&self, w: &mut ByteWriter<'_>) -> Result<(), CodecError> {".to_string());
        for (_, fragment) in &fragments {
            code.push(indent(&fragment.encode, 2));
        }
    }
    code.push("        Ok(())".to_string());
    code.push("    }".to_string());
    code.push(String::new());

    if fragments.is_empty() {
        code.push("    fn read(_r: &mut ByteReader<'_>) -> Result<Self, CodecError> {".to_string());
        code.push("        Ok(Self {})".to_string());
    } else {
        code.push("    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {".to_string());
        code.push("        Ok(Self {".to_string());
        for (ident, fragment) in &fragments {
            code.push(indent(&format!("{}: {},", ident, fragment.decode), 3));
        }
        code.push("        })".to_string());
    }
    code.push("    }".to_string());
    code.push("}".to_string());

    code.join("\n")
}

fn generate_service(rpc: &RpcDesc) -> String {
    let mut code = vec![
        format!("pub trait {} {{", service_name(rpc)),
        "    type Error;".to_string(),
    ];
    for method in &rpc.methods {
        code.push(String::new());
        code.push(format!(
            "    fn {}(&mut self, req: &{}) -> Result<{}, Self::Error>;",
            method_ident(&method.name),
            type_ident(&method.request),
            type_ident(&method.reply)
        ));
    }
    code.push("}".to_string());
    code.join("\n")
}
