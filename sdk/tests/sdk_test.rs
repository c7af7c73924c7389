#![cfg(test)]

use kproto::{compile, descriptor_to_json, ByteReader, ByteWriter, CodecError, KprotoError, Message};
use kproto::compiler::CodegenOptions;

const SCHEMA: &str = "package rust: shapes\nmessage Point:3\n  X int32\n  Y int32\nmessage Path\n  Name string:8\n  Points Point:4\n";

#[test]
fn test_descriptor_to_json() {
    let json = descriptor_to_json("shapes.kproto", SCHEMA).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["file_name"], "shapes.kproto");
    assert_eq!(value["packages"][0]["lang"], "rust");
    assert_eq!(value["messages"][0]["id"], 3);
    assert_eq!(value["messages"][1]["id"], 4);
    assert_eq!(value["messages"][0]["fields"][0]["ty"]["kind"], "primitive");
    assert_eq!(value["messages"][0]["fields"][0]["ty"]["name"], "int32");
    assert_eq!(value["messages"][1]["fields"][1]["ty"]["kind"], "message");
    assert_eq!(value["messages"][1]["fields"][1]["ty"]["name"], "Point");
    assert_eq!(value["messages"][1]["fields"][1]["length"], 4);
}

#[test]
fn test_descriptor_to_json_reports_diagnostics() {
    let err = descriptor_to_json("bad.kproto", "message A\n  Name string\n").unwrap_err();
    assert!(matches!(err, KprotoError::Parse(_)));
    assert_eq!(err.to_string(), "bad.kproto:2: string field \"Name\" must define a max length");
}

#[test]
fn test_compile() {
    let code = compile("shapes.kproto", SCHEMA, "rust", &CodegenOptions::default()).unwrap();
    assert!(code.contains("pub mod shapes {"));
    assert!(code.contains("impl Message for Path {"));
    // 8 + 2 + (4 + 4) * 4 + 2
    assert!(code.contains("const MAX_SIZE: usize = 44;"));

    let err = compile("shapes.kproto", SCHEMA, "zig", &CodegenOptions::default()).unwrap_err();
    assert!(matches!(err, KprotoError::UnknownBackend { .. }));
}

// The same shape the rust backend emits for `Point`, written against the
// re-exported runtime.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Message for Point {
    const ID: u16 = 3;
    const MAX_SIZE: usize = 8;

    fn write(&self, w: &mut ByteWriter<'_>) -> Result<(), CodecError> {
        w.write_i32(self.x)?;
        w.write_i32(self.y)?;
        Ok(())
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            x: r.read_i32()?,
            y: r.read_i32()?,
        })
    }
}

#[test]
fn test_runtime_reexports() {
    let point = Point { x: -1, y: 2 };
    let bytes = point.encode_to_vec().unwrap();
    assert_eq!(bytes, [255, 255, 255, 255, 2, 0, 0, 0]);
    assert_eq!(Point::decode(&bytes), Ok(point));
    assert!(matches!(Point::decode(&bytes[..5]), Err(CodecError::EndOfBuffer { .. })));
}
