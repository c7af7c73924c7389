use std::collections::HashMap;

use kproto_wire::LENGTH_PREFIX_SIZE;
use serde::Serialize;

use crate::error::SemanticError;

/// The closed set of scalar type tokens a field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Byte,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 13] = [
        Primitive::Bool,
        Primitive::Byte,
        Primitive::Int8,
        Primitive::Uint8,
        Primitive::Int16,
        Primitive::Uint16,
        Primitive::Int32,
        Primitive::Uint32,
        Primitive::Int64,
        Primitive::Uint64,
        Primitive::Float32,
        Primitive::Float64,
        Primitive::String,
    ];

    pub fn from_token(token: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.token() == token)
    }

    /// The schema spelling of this type.
    pub fn token(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::Int8 => "int8",
            Primitive::Uint8 => "uint8",
            Primitive::Int16 => "int16",
            Primitive::Uint16 => "uint16",
            Primitive::Int32 => "int32",
            Primitive::Uint32 => "uint32",
            Primitive::Int64 => "int64",
            Primitive::Uint64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
        }
    }

    /// Bytes one element occupies when sizing a message. Strings count one
    /// byte per unit of their length marker.
    pub fn width(self) -> usize {
        match self {
            Primitive::Bool | Primitive::Byte | Primitive::Int8 | Primitive::Uint8 => 1,
            Primitive::String => 1,
            Primitive::Int16 | Primitive::Uint16 => 2,
            Primitive::Int32 | Primitive::Uint32 | Primitive::Float32 => 4,
            Primitive::Int64 | Primitive::Uint64 | Primitive::Float64 => 8,
        }
    }
}

/// A field's type, split once at parse time into a primitive or a reference
/// to another message by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum FieldType {
    Primitive(Primitive),
    Message(String),
}

impl FieldType {
    pub fn from_token(token: &str) -> FieldType {
        match Primitive::from_token(token) {
            Some(primitive) => FieldType::Primitive(primitive),
            None => FieldType::Message(token.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            FieldType::Primitive(primitive) => primitive.token(),
            FieldType::Message(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDesc {
    /// Target language tag; empty when the declaration names no language.
    pub lang: String,
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDesc {
    pub name:   String,
    pub ty:     FieldType,
    /// First length marker. Makes non-string fields arrays; on strings it is
    /// the maximum byte length.
    pub length: u16,
    /// Second length marker, only accepted on strings: the maximum number of
    /// strings in a string array.
    pub count:  u16,
    pub line:   usize,
}

impl FieldDesc {
    /// Whether the field is encoded as a length-prefixed sequence of elements.
    pub fn is_array(&self) -> bool {
        match self.ty {
            FieldType::Primitive(Primitive::String) => self.count > 0,
            _ => self.length > 0,
        }
    }

    /// Worst-case encoded size given the size of one scalar element.
    pub fn encoded_max(&self, width: usize) -> Option<usize> {
        let mut size = width;
        if self.length > 0 {
            size = size
                .checked_mul(self.length as usize)?
                .checked_add(LENGTH_PREFIX_SIZE)?;
        }
        if self.count > 0 {
            size = size
                .checked_mul(self.count as usize)?
                .checked_add(LENGTH_PREFIX_SIZE)?;
        }
        Some(size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDesc {
    pub id:     u16,
    pub name:   String,
    pub fields: Vec<FieldDesc>,
    pub line:   usize,
}

impl MessageDesc {
    pub fn add_field(&mut self, field: FieldDesc) {
        self.fields.push(field);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDesc {
    pub name:    String,
    pub request: String,
    pub reply:   String,
    pub line:    usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcDesc {
    pub name:    String,
    pub methods: Vec<MethodDesc>,
    pub line:    usize,
}

impl RpcDesc {
    pub fn add_method(&mut self, name: &str, request: &str, reply: &str, line: usize) {
        self.methods.push(MethodDesc {
            name:    name.to_string(),
            request: request.to_string(),
            reply:   reply.to_string(),
            line,
        });
    }

    pub fn get_method(&self, name: &str) -> Option<&MethodDesc> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Root of one parsed schema file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FileDesc {
    pub file_name:    String,
    /// Last message ID handed out.
    pub id_counter:   u16,
    /// Package chosen for the current code generation run.
    pub package_name: Option<String>,
    pub packages:     Vec<PackageDesc>,
    pub messages:     Vec<MessageDesc>,
    pub rpcs:         Vec<RpcDesc>,
}

impl FileDesc {
    pub fn new(file_name: &str) -> Self {
        FileDesc {
            file_name: file_name.to_string(),
            ..FileDesc::default()
        }
    }

    pub fn add_package(&mut self, lang: &str, name: &str, line: usize) {
        self.packages.push(PackageDesc {
            lang: lang.to_string(),
            name: name.to_string(),
            line,
        });
    }

    /// The package declared for `lang`, falling back to one declared without
    /// a language tag.
    pub fn package_for(&self, lang: &str) -> Option<&PackageDesc> {
        self.packages
            .iter()
            .find(|p| p.lang == lang)
            .or_else(|| self.packages.iter().find(|p| p.lang.is_empty()))
    }

    /// Resolve `package_name` for a code generation run targeting `lang`.
    pub fn select_package(&mut self, lang: &str) -> Option<&str> {
        self.package_name = self.package_for(lang).map(|p| p.name.clone());
        self.package_name.as_deref()
    }

    /// Advance the ID counter. An explicit ID resets the counter to it;
    /// otherwise the counter is incremented. Returns `None` when an implicit
    /// ID would overflow.
    pub fn next_message_id(&mut self, explicit: Option<u16>) -> Option<u16> {
        let id = match explicit {
            Some(id) => id,
            None => self.id_counter.checked_add(1)?,
        };
        self.id_counter = id;
        Some(id)
    }

    pub fn add_message(&mut self, id: u16, name: &str, line: usize) -> &mut MessageDesc {
        self.messages.push(MessageDesc {
            id,
            name: name.to_string(),
            fields: Vec::new(),
            line,
        });
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    pub fn get_message(&self, name: &str) -> Option<&MessageDesc> {
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn add_rpc(&mut self, name: &str, line: usize) -> &mut RpcDesc {
        self.rpcs.push(RpcDesc {
            name: name.to_string(),
            methods: Vec::new(),
            line,
        });
        let last = self.rpcs.len() - 1;
        &mut self.rpcs[last]
    }

    pub fn get_rpc(&self, name: &str) -> Option<&RpcDesc> {
        self.rpcs.iter().find(|r| r.name == name)
    }

    /// Worst-case encoded size of the named message.
    pub fn max_size(&self, message: &str) -> Result<usize, SemanticError> {
        let message = self
            .get_message(message)
            .ok_or_else(|| SemanticError::UnknownMessage { name: message.to_string() })?;
        Sizer::new(self).message_size(message)
    }

    /// Worst-case encoded size of every message, in declaration order.
    pub fn max_sizes(&self) -> Result<Vec<(&str, usize)>, SemanticError> {
        let mut sizer = Sizer::new(self);
        let mut sizes = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            sizes.push((message.name.as_str(), sizer.message_size(message)?));
        }
        Ok(sizes)
    }
}

/// Recursive size walk with memoization. Messages currently being sized sit
/// on `stack`, so a reference back into it is a cycle rather than unbounded
/// recursion.
struct Sizer<'f> {
    file:  &'f FileDesc,
    memo:  HashMap<&'f str, usize>,
    stack: Vec<&'f str>,
}

impl<'f> Sizer<'f> {
    fn new(file: &'f FileDesc) -> Self {
        Sizer { file, memo: HashMap::new(), stack: Vec::new() }
    }

    fn message_size(&mut self, message: &'f MessageDesc) -> Result<usize, SemanticError> {
        if let Some(&size) = self.memo.get(message.name.as_str()) {
            return Ok(size);
        }
        if let Some(start) = self.stack.iter().position(|n| *n == message.name) {
            let mut path: Vec<String> = self.stack[start..].iter().map(|n| n.to_string()).collect();
            path.push(message.name.clone());
            return Err(SemanticError::TypeCycle { path });
        }

        self.stack.push(&message.name);
        let mut total = 0usize;
        for field in &message.fields {
            let size = self.field_size(message, field)?;
            total = total
                .checked_add(size)
                .ok_or_else(|| SemanticError::SizeOverflow { message: message.name.clone() })?;
        }
        self.stack.pop();

        self.memo.insert(&message.name, total);
        Ok(total)
    }

    fn field_size(&mut self, message: &'f MessageDesc, field: &'f FieldDesc) -> Result<usize, SemanticError> {
        let width = match &field.ty {
            FieldType::Primitive(primitive) => primitive.width(),
            FieldType::Message(ty) if *ty == message.name => {
                return Err(SemanticError::SelfReference {
                    message: message.name.clone(),
                    field:   field.name.clone(),
                });
            }
            FieldType::Message(ty) => {
                let other = self.file.get_message(ty).ok_or_else(|| SemanticError::UnresolvedType {
                    message: message.name.clone(),
                    field:   field.name.clone(),
                    ty:      ty.clone(),
                })?;
                self.message_size(other)?
            }
        };
        field
            .encoded_max(width)
            .ok_or_else(|| SemanticError::SizeOverflow { message: message.name.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str, length: u16, count: u16) -> FieldDesc {
        FieldDesc {
            name: name.to_string(),
            ty: FieldType::from_token(ty),
            length,
            count,
            line: 0,
        }
    }

    fn file_with(messages: &[(&str, Vec<FieldDesc>)]) -> FileDesc {
        let mut file = FileDesc::new("test.kproto");
        for (name, fields) in messages {
            let id = file.next_message_id(None).unwrap();
            let message = file.add_message(id, name, 0);
            for f in fields {
                message.add_field(f.clone());
            }
        }
        file
    }

    #[test]
    fn primitive_tokens() {
        for primitive in Primitive::ALL {
            assert_eq!(Primitive::from_token(primitive.token()), Some(primitive));
        }
        assert_eq!(Primitive::from_token("int"), None);
        assert_eq!(FieldType::from_token("Auth"), FieldType::Message("Auth".to_string()));
        assert_eq!(FieldType::from_token("uint16"), FieldType::Primitive(Primitive::Uint16));
    }

    #[test]
    fn id_counter() {
        let mut file = FileDesc::new("ids.kproto");
        assert_eq!(file.next_message_id(None), Some(1));
        assert_eq!(file.next_message_id(Some(50)), Some(50));
        assert_eq!(file.next_message_id(None), Some(51));
        assert_eq!(file.next_message_id(Some(u16::MAX)), Some(u16::MAX));
        assert_eq!(file.next_message_id(None), None);
    }

    #[test]
    fn max_size_follows_markers() {
        let file = file_with(&[
            ("Auth", vec![field("Test", "uint32", 0, 0)]),
            (
                "Login",
                vec![
                    field("ID", "uint64", 0, 0),
                    field("UserName", "string", 32, 0),
                    field("Auth", "Auth", 0, 0),
                    field("Auths", "Auth", 3, 0),
                    field("Flags", "bool", 4, 0),
                    field("Tags", "string", 8, 2),
                ],
            ),
        ]);
        assert_eq!(file.max_size("Auth"), Ok(4));
        // 8 + (32 + 2) + 4 + (4 * 3 + 2) + (4 + 2) + (2 * (8 + 2) + 2)
        assert_eq!(file.max_size("Login"), Ok(8 + 34 + 4 + 14 + 6 + 22));
        assert_eq!(file.max_sizes(), Ok(vec![("Auth", 4), ("Login", 88)]));
    }

    #[test]
    fn max_size_rejects_self_reference() {
        let file = file_with(&[("Node", vec![field("Next", "Node", 0, 0)])]);
        assert_eq!(
            file.max_size("Node"),
            Err(SemanticError::SelfReference {
                message: "Node".to_string(),
                field:   "Next".to_string(),
            })
        );
    }

    #[test]
    fn max_size_rejects_unresolved_type() {
        let file = file_with(&[("A", vec![field("B", "Missing", 0, 0)])]);
        assert_eq!(
            file.max_size("A"),
            Err(SemanticError::UnresolvedType {
                message: "A".to_string(),
                field:   "B".to_string(),
                ty:      "Missing".to_string(),
            })
        );
        assert!(matches!(
            file.max_size("Nope"),
            Err(SemanticError::UnknownMessage { .. })
        ));
    }

    #[test]
    fn max_size_detects_indirect_cycle() {
        let file = file_with(&[
            ("A", vec![field("B", "B", 0, 0)]),
            ("B", vec![field("C", "C", 2, 0)]),
            ("C", vec![field("A", "A", 0, 0)]),
        ]);
        assert_eq!(
            file.max_size("A"),
            Err(SemanticError::TypeCycle {
                path: vec!["A".into(), "B".into(), "C".into(), "A".into()],
            })
        );
    }

    #[test]
    fn field_order_is_kept() {
        let file = file_with(&[(
            "M",
            vec![field("Z", "int8", 0, 0), field("A", "int64", 0, 0)],
        )]);
        let names: Vec<_> = file.messages[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Z", "A"]);
    }

    #[test]
    fn package_selection() {
        let mut file = FileDesc::new("p.kproto");
        file.add_package("go", "gopkg", 1);
        file.add_package("", "shared", 2);
        assert_eq!(file.select_package("go"), Some("gopkg"));
        assert_eq!(file.select_package("rust"), Some("shared"));
        assert_eq!(file.package_name.as_deref(), Some("shared"));
    }
}
