use tracing::{debug, info};

use crate::{
    backend::{indent_with, Backend, CodegenOptions, FieldDispatch, FieldFragments},
    error::KprotoError,
    types::{FieldDesc, FieldType, FileDesc, MessageDesc, Primitive, RpcDesc},
};

/// Go import path of the runtime codec unless overridden.
pub const DEFAULT_RUNTIME: &str = "github.com/taodev/kproto";

/// Emits a Go source file against the `kproto` Go runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoBackend;

impl Backend for GoBackend {
    fn lang(&self) -> &'static str {
        "go"
    }

    fn file_extension(&self) -> &'static str {
        "go"
    }

    fn generate(&self, file: &FileDesc, options: &CodegenOptions) -> Result<String, KprotoError> {
        compile_file_to_go(file, options)
    }
}

/// Method suffix of `Write*`/`Read*` for a primitive.
fn wire_name(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Bool => "Bool",
        Primitive::Byte => "Byte",
        Primitive::Int8 => "Int8",
        Primitive::Uint8 => "Uint8",
        Primitive::Int16 => "Int16",
        Primitive::Uint16 => "Uint16",
        Primitive::Int32 => "Int32",
        Primitive::Uint32 => "Uint32",
        Primitive::Int64 => "Int64",
        Primitive::Uint64 => "Uint64",
        Primitive::Float32 => "Float32",
        Primitive::Float64 => "Float64",
        Primitive::String => "String",
    }
}

fn map_type(field: &FieldDesc) -> String {
    // Schema primitive tokens are already Go type names.
    let base = match &field.ty {
        FieldType::Primitive(primitive) => primitive.token(),
        FieldType::Message(name) => name.as_str(),
    };
    if field.is_array() {
        format!("[]{}", base)
    } else {
        base.to_string()
    }
}

impl FieldDispatch for GoBackend {
    fn primitive(&self, field: &FieldDesc, primitive: Primitive, is_array: bool) -> FieldFragments {
        let suffix = if is_array { "Array" } else { "" };
        let name = wire_name(primitive);
        FieldFragments {
            encode: format!("err = w.Write{}{}(msg.{})", name, suffix, field.name),
            decode: format!("msg.{}, err = r.Read{}{}()", field.name, name, suffix),
        }
    }

    fn message(&self, field: &FieldDesc, type_name: &str, is_array: bool) -> FieldFragments {
        let name = &field.name;
        if is_array {
            FieldFragments {
                encode: format!(
                    "{{\n\tl := len(msg.{0})\n\terr = w.WriteLength(l)\n\tif err != nil {{\n\t\treturn\n\t}}\n\tfor i := 0; i < l; i++ {{\n\t\tif err = msg.{0}[i].Write(w); err != nil {{\n\t\t\treturn\n\t\t}}\n\t}}\n}}",
                    name
                ),
                decode: format!(
                    "{{\n\tvar l int\n\tl, err = r.ReadLength()\n\tif err != nil {{\n\t\treturn\n\t}}\n\tmsg.{0} = make([]{1}, l)\n\tfor i := 0; i < l; i++ {{\n\t\tif err = msg.{0}[i].Read(r); err != nil {{\n\t\t\treturn\n\t\t}}\n\t}}\n}}",
                    name, type_name
                ),
            }
        } else {
            FieldFragments {
                encode: format!("err = msg.{}.Write(w)", name),
                decode: format!("err = msg.{}.Read(r)", name),
            }
        }
    }
}

/// Compiles a verified file into Go source. Go requires a package clause, so
/// a file without a package for `go` (or without a language tag) is an error.
pub fn compile_file_to_go(file: &FileDesc, options: &CodegenOptions) -> Result<String, KprotoError> {
    let package = file.package_name.as_deref().ok_or_else(|| KprotoError::Codegen {
        lang: "go".to_string(),
        msg:  "no package declared for go".to_string(),
    })?;

    let mut go_code: Vec<String> = vec![
        format!("// Code generated by kprotoc from {}. DO NOT EDIT.", file.file_name),
        String::new(),
        format!("package {}", package),
    ];

    if !file.messages.is_empty() {
        go_code.push(String::new());
        go_code.push(format!("import kproto \"{}\"", options.runtime_or(DEFAULT_RUNTIME)));
        go_code.push(String::new());
        go_code.push("const (".to_string());
        for message in &file.messages {
            go_code.push(format!("\t{}ID = {}", message.name, message.id));
        }
        go_code.push(")".to_string());
    }

    for message in &file.messages {
        go_code.push(String::new());
        go_code.push(generate_struct(message));
    }

    if !options.skip_rpc {
        for rpc in &file.rpcs {
            go_code.push(String::new());
            go_code.push(generate_interface(rpc));
        }
    }

    let backend = GoBackend;
    for message in &file.messages {
        debug!(message = %message.name, "emitting go message");
        let max_size = file.max_size(&message.name)?;
        go_code.push(String::new());
        go_code.push(generate_methods(&backend, message, max_size));
    }

    info!(file = %file.file_name, messages = file.messages.len(), "generated go source");
    Ok(go_code.join("\n") + "\n")
}

fn generate_struct(message: &MessageDesc) -> String {
    let mut code = vec![format!("type {} struct {{", message.name)];
    for field in &message.fields {
        code.push(format!("\t{} {}", field.name, map_type(field)));
    }
    code.push("}".to_string());
    code.join("\n")
}

fn generate_interface(rpc: &RpcDesc) -> String {
    let mut code = vec![format!("type I{} interface {{", rpc.name)];
    for method in &rpc.methods {
        code.push(format!(
            "\t{}(req *{}) (reply *{}, err error)",
            method.name, method.request, method.reply
        ));
    }
    code.push("}".to_string());
    code.join("\n")
}

fn generate_methods(backend: &GoBackend, message: &MessageDesc, max_size: usize) -> String {
    let check = "\tif err != nil {\n\t\treturn\n\t}";
    let fragments: Vec<FieldFragments> = message.fields.iter().map(|f| backend.dispatch(f)).collect();

    let mut code = vec![format!("func (msg *{}) Write(w *kproto.ByteWriter) (err error) {{", message.name)];
    for fragment in &fragments {
        code.push(indent_with(&fragment.encode, "\t"));
        code.push(check.to_string());
    }
    code.push("\treturn".to_string());
    code.push("}".to_string());
    code.push(String::new());

    code.push(format!("func (msg *{}) Read(r *kproto.ByteReader) (err error) {{", message.name));
    for fragment in &fragments {
        code.push(indent_with(&fragment.decode, "\t"));
        code.push(check.to_string());
    }
    code.push("\treturn".to_string());
    code.push("}".to_string());
    code.push(String::new());

    code.push(format!("func (msg *{}) MaxSize() int {{", message.name));
    code.push(format!("\treturn {}", max_size));
    code.push("}".to_string());
    code.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_schema, ParseOptions};

    fn generate(text: &str, options: &CodegenOptions) -> Result<String, KprotoError> {
        let mut file = parse_schema("gen.kproto", text, &ParseOptions::default())
            .into_result()
            .unwrap();
        file.select_package("go");
        compile_file_to_go(&file, options)
    }

    #[test]
    fn emits_go_file() {
        let code = generate(
            "package go: examples\nmessage AuthMsg:101\n  Test uint32\nrpc LoginService:\n  Login(AuthMsg) AuthMsg\n",
            &CodegenOptions::default(),
        )
        .unwrap();
        assert_eq!(
            code,
            "// Code generated by kprotoc from gen.kproto. DO NOT EDIT.

package examples

import kproto \"github.com/taodev/kproto\"

const (
\tAuthMsgID = 101
)

type AuthMsg struct {
\tTest uint32
}

type ILoginService interface {
\tLogin(req *AuthMsg) (reply *AuthMsg, err error)
}

func (msg *AuthMsg) Write(w *kproto.ByteWriter) (err error) {
\terr = w.WriteUint32(msg.Test)
\tif err != nil {
\t\treturn
\t}
\treturn
}

func (msg *AuthMsg) Read(r *kproto.ByteReader) (err error) {
\tmsg.Test, err = r.ReadUint32()
\tif err != nil {
\t\treturn
\t}
\treturn
}

func (msg *AuthMsg) MaxSize() int {
\treturn 4
}
"
        );
    }

    #[test]
    fn emits_arrays_and_nested_messages() {
        let code = generate(
            "package examples\nmessage Auth\n  Test uint32\nmessage Login\n  Name string:8\n  Tags string:8:2\n  Flags bool:4\n  Auth Auth\n  Auths Auth:3\n",
            &CodegenOptions { skip_rpc: true, runtime: None },
        )
        .unwrap();
        assert!(code.contains("\tName string\n\tTags []string\n\tFlags []bool\n\tAuth Auth\n\tAuths []Auth\n"));
        assert!(code.contains("\terr = w.WriteString(msg.Name)\n"));
        assert!(code.contains("\terr = w.WriteStringArray(msg.Tags)\n"));
        assert!(code.contains("\tmsg.Flags, err = r.ReadBoolArray()\n"));
        assert!(code.contains("\terr = msg.Auth.Read(r)\n"));
        assert!(code.contains("\t\tl, err = r.ReadLength()\n"));
        assert!(code.contains("\t\tmsg.Auths = make([]Auth, l)\n"));
        assert!(code.contains("\t\t\tif err = msg.Auths[i].Write(w); err != nil {\n"));
    }

    #[test]
    fn requires_a_package() {
        let err = generate("message A\n  X int8\n", &CodegenOptions::default()).unwrap_err();
        assert!(matches!(err, KprotoError::Codegen { ref lang, .. } if lang == "go"));

        let code = generate("package rust: only_rust\npackage shared\nmessage A\n", &CodegenOptions::default()).unwrap();
        assert!(code.contains("\npackage shared\n"));
    }
}
