use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    error::{Diagnostic, DiagnosticKind, Diagnostics, KprotoError, ParseFailure},
    lexer::{classify_line, LineKind},
    types::{FieldDesc, FieldType, FileDesc, Primitive},
    verifier::verify_file,
};

lazy_static! {
    static ref PACKAGE:         Regex = Regex::new(r"^\s*package\s+(?:(\w+)\s*(?::\s*|\s+))?(\w+)\s*(?://.*)?$").unwrap();
    static ref PACKAGE_NO_LANG: Regex = Regex::new(r"^\s*package\s*:").unwrap();
    static ref MESSAGE:         Regex = Regex::new(r"^\s*message\s+([A-Za-z_]\w*)\s*(?::\s*(\w*))?\s*(?://.*)?$").unwrap();
    static ref FIELD:           Regex = Regex::new(r"^\s+(\w+)\s+(\w+)\s*([^/]*?)\s*(?://.*)?$").unwrap();
    static ref RPC:             Regex = Regex::new(r"^\s*rpc\s+([A-Z]\w*)\s*:\s*(?://.*)?$").unwrap();
    static ref METHOD:          Regex = Regex::new(r"^\s+([A-Z]\w*)\s*\(\s*(\w+)\s*\)\s*(\w+)\s*(?://.*)?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Report messages declared before any `package` line.
    pub strict_package: bool,
}

/// Everything one parse produced. The file is returned even when
/// diagnostics were recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub file:        FileDesc,
    pub diagnostics: Diagnostics,
    /// Set when parsing stopped at a package declared out of order.
    pub aborted:     bool,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The parsed file, or a combined failure carrying every diagnostic.
    pub fn into_result(self) -> Result<FileDesc, KprotoError> {
        if self.diagnostics.is_empty() {
            Ok(self.file)
        } else {
            Err(ParseFailure {
                diagnostics: self.diagnostics,
                file:        self.file,
                fatal:       self.aborted,
            }
            .into())
        }
    }
}

/// Parse schema text. `file_name` is only used to label diagnostics.
pub fn parse_schema(file_name: &str, text: &str, options: &ParseOptions) -> ParseOutput {
    Parser::new(file_name, *options).parse(text)
}

/// Which declaration subsequent indented lines belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Message(usize),
    Rpc(usize),
    /// The header was rejected. Body lines are still checked but not recorded.
    Skipped,
}

struct Parser {
    options:         ParseOptions,
    file:            FileDesc,
    diagnostics:     Diagnostics,
    line:            usize,
    block:           Block,
    has_package:     bool,
    seen_block:      bool,
    warned_no_package: bool,
}

impl Parser {
    fn new(file_name: &str, options: ParseOptions) -> Self {
        Parser {
            options,
            file: FileDesc::new(file_name),
            diagnostics: Diagnostics::default(),
            line: 0,
            block: Block::None,
            has_package: false,
            seen_block: false,
            warned_no_package: false,
        }
    }

    fn parse(mut self, text: &str) -> ParseOutput {
        for (index, line) in text.lines().enumerate() {
            self.line = index + 1;
            let kind = classify_line(line);
            debug!(line = self.line, kind = kind.as_str(), "classified line");

            let result = match kind {
                LineKind::SpaceLine | LineKind::Comment => Ok(()),
                LineKind::Package if self.seen_block => {
                    self.report(DiagnosticKind::PackageOutOfOrder);
                    return self.finish(true);
                }
                LineKind::Package => self.parse_package(line),
                LineKind::Message => self.parse_message(line),
                LineKind::Field => self.parse_field(line),
                LineKind::Rpc => self.parse_rpc(line),
                LineKind::Method => self.parse_method(line),
                LineKind::Unknown => Err(DiagnosticKind::UnknownLine(line.trim().to_string())),
            };
            if let Err(kind) = result {
                self.report(kind);
            }
        }
        self.finish(false)
    }

    fn finish(mut self, aborted: bool) -> ParseOutput {
        if !aborted {
            for (line, kind) in verify_file(&self.file) {
                self.report_at(line, kind);
            }
            self.diagnostics.0.sort_by_key(|d| d.line);
        }
        info!(
            file = %self.file.file_name,
            messages = self.file.messages.len(),
            rpcs = self.file.rpcs.len(),
            errors = self.diagnostics.len(),
            aborted,
            "parsed schema"
        );
        ParseOutput {
            file: self.file,
            diagnostics: self.diagnostics,
            aborted,
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        self.report_at(self.line, kind);
    }

    fn report_at(&mut self, line: usize, kind: DiagnosticKind) {
        warn!(file = %self.file.file_name, line, "{}", kind);
        self.diagnostics.push(Diagnostic {
            file: self.file.file_name.clone(),
            line,
            kind,
        });
    }

    fn parse_package(&mut self, line: &str) -> Result<(), DiagnosticKind> {
        let caps = match PACKAGE.captures(line) {
            Some(caps) => caps,
            None if PACKAGE_NO_LANG.is_match(line) => return Err(DiagnosticKind::MissingPackageLang),
            None => return Err(DiagnosticKind::MalformedPackage(line.trim().to_string())),
        };
        let lang = caps.get(1).map_or("", |m| m.as_str());
        let name = &caps[2];
        if self.file.packages.iter().any(|p| p.lang == lang) {
            return Err(DiagnosticKind::DuplicatePackage(lang.to_string()));
        }
        self.file.add_package(lang, name, self.line);
        self.has_package = true;
        Ok(())
    }

    fn parse_message(&mut self, line: &str) -> Result<(), DiagnosticKind> {
        self.seen_block = true;
        self.block = Block::Skipped;

        if self.options.strict_package && !self.has_package && !self.warned_no_package {
            self.warned_no_package = true;
            self.report(DiagnosticKind::MissingPackage);
        }

        let caps = MESSAGE
            .captures(line)
            .ok_or_else(|| DiagnosticKind::MalformedMessage(line.trim().to_string()))?;
        let name = &caps[1];

        let explicit = match caps.get(2).map(|m| m.as_str()).filter(|id| !id.is_empty()) {
            None => None,
            Some(text) => match text.parse::<u16>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    return Err(DiagnosticKind::InvalidMessageId {
                        name: name.to_string(),
                        id:   text.to_string(),
                    })
                }
            },
        };

        if self.file.get_message(name).is_some() {
            return Err(DiagnosticKind::DuplicateMessage(name.to_string()));
        }
        let id = self
            .file
            .next_message_id(explicit)
            .ok_or_else(|| DiagnosticKind::IdCounterOverflow(name.to_string()))?;
        if let Some(other) = self.file.messages.iter().find(|m| m.id == id) {
            return Err(DiagnosticKind::DuplicateMessageId {
                name: name.to_string(),
                id,
                other: other.name.clone(),
            });
        }

        self.file.add_message(id, name, self.line);
        self.block = Block::Message(self.file.messages.len() - 1);
        debug!(message = name, id, "opened message");
        Ok(())
    }

    fn parse_field(&mut self, line: &str) -> Result<(), DiagnosticKind> {
        let index = match self.block {
            Block::Message(index) => Some(index),
            Block::Skipped => None,
            Block::None | Block::Rpc(_) => return Err(DiagnosticKind::FieldOutsideMessage),
        };
        let field = self.read_field(line)?;
        let Some(index) = index else { return Ok(()) };

        let message = &mut self.file.messages[index];
        if message.get_field(&field.name).is_some() {
            return Err(DiagnosticKind::DuplicateField {
                message: message.name.clone(),
                field:   field.name,
            });
        }
        message.add_field(field);
        Ok(())
    }

    /// The checks on a field line that do not need the enclosing message.
    fn read_field(&self, line: &str) -> Result<FieldDesc, DiagnosticKind> {
        if !line.starts_with(char::is_whitespace) {
            let word = line.split_whitespace().next().unwrap_or_default();
            return Err(DiagnosticKind::FieldNotIndented(word.to_string()));
        }
        let caps = FIELD
            .captures(line)
            .ok_or_else(|| DiagnosticKind::MalformedField(line.trim().to_string()))?;
        let name = &caps[1];
        let ty = FieldType::from_token(&caps[2]);
        let markers = &caps[3];

        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(DiagnosticKind::InvalidFieldName(name.to_string()));
        }
        let lengths = parse_length_markers(name, markers)?;
        match (lengths.len(), &ty) {
            (0, FieldType::Primitive(Primitive::String)) => {
                return Err(DiagnosticKind::StringWithoutLength(name.to_string()));
            }
            (0 | 1, _) | (2, FieldType::Primitive(Primitive::String)) => {}
            (2, _) => {
                return Err(DiagnosticKind::UnexpectedCount {
                    field: name.to_string(),
                    ty:    ty.token().to_string(),
                });
            }
            _ => return Err(DiagnosticKind::TooManyLengths(name.to_string())),
        }

        Ok(FieldDesc {
            name: name.to_string(),
            ty,
            length: lengths.first().copied().unwrap_or(0),
            count: lengths.get(1).copied().unwrap_or(0),
            line: self.line,
        })
    }

    fn parse_rpc(&mut self, line: &str) -> Result<(), DiagnosticKind> {
        self.seen_block = true;
        self.block = Block::Skipped;

        let caps = RPC
            .captures(line)
            .ok_or_else(|| DiagnosticKind::MalformedRpc(line.trim().to_string()))?;
        let name = &caps[1];
        if self.file.get_rpc(name).is_some() {
            return Err(DiagnosticKind::DuplicateRpc(name.to_string()));
        }

        self.file.add_rpc(name, self.line);
        self.block = Block::Rpc(self.file.rpcs.len() - 1);
        debug!(rpc = name, "opened rpc");
        Ok(())
    }

    fn parse_method(&mut self, line: &str) -> Result<(), DiagnosticKind> {
        let index = match self.block {
            Block::Rpc(index) => Some(index),
            Block::Skipped => None,
            Block::None | Block::Message(_) => return Err(DiagnosticKind::MethodOutsideRpc),
        };

        let caps = METHOD
            .captures(line)
            .ok_or_else(|| DiagnosticKind::MalformedMethod(line.trim().to_string()))?;
        let Some(index) = index else { return Ok(()) };
        let (name, request, reply) = (&caps[1], &caps[2], &caps[3]);

        let rpc = &mut self.file.rpcs[index];
        if rpc.get_method(name).is_some() {
            return Err(DiagnosticKind::DuplicateMethod {
                rpc:    rpc.name.clone(),
                method: name.to_string(),
            });
        }
        rpc.add_method(name, request, reply, self.line);
        Ok(())
    }
}

/// Split the `:<n>[:<m>]` suffix of a field line into its lengths.
fn parse_length_markers(field: &str, markers: &str) -> Result<Vec<u16>, DiagnosticKind> {
    if markers.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = markers.strip_prefix(':') else {
        return Err(if markers.starts_with(|c: char| c.is_ascii_digit()) {
            DiagnosticKind::LengthWithoutColon(field.to_string())
        } else {
            DiagnosticKind::MalformedField(markers.to_string())
        });
    };

    rest.split(':')
        .map(str::trim)
        .map(|part| {
            if part.is_empty() {
                return Err(DiagnosticKind::MissingLength(field.to_string()));
            }
            match part.parse::<u16>() {
                Ok(len) if len > 0 => Ok(len),
                _ => Err(DiagnosticKind::InvalidLength {
                    field: field.to_string(),
                    value: part.to_string(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseOutput {
        parse_schema("test.kproto", text, &ParseOptions::default())
    }

    fn lines(output: &ParseOutput) -> Vec<usize> {
        output.diagnostics.iter().map(|d| d.line).collect()
    }

    #[test]
    fn parse_full_schema() {
        let output = parse(
            "package go: mypkg\n\
             package rust mycrate\n\
             // login messages\n\
             message Login:102\n\
             \x20 ID       uint64\n\
             \x20 UserName string:64  // display name\n\
             \x20 Tags     string:32:8\n\
             \n\
             message AuthReply\n\
             \x20 Ok bool\n\
             rpc Auth:\n\
             \x20 Login(Login) AuthReply\n",
        );
        assert!(output.is_ok(), "{}", output.diagnostics);
        let file = output.file;

        assert_eq!(file.packages.len(), 2);
        assert_eq!(file.package_for("go").map(|p| p.name.as_str()), Some("mypkg"));
        assert_eq!(file.package_for("rust").map(|p| p.name.as_str()), Some("mycrate"));

        let login = file.get_message("Login").unwrap();
        assert_eq!(login.id, 102);
        assert_eq!(login.line, 4);
        let tags = login.get_field("Tags").unwrap();
        assert_eq!(tags.ty, FieldType::Primitive(Primitive::String));
        assert_eq!((tags.length, tags.count), (32, 8));
        assert!(tags.is_array());
        assert!(!login.get_field("UserName").unwrap().is_array());

        assert_eq!(file.get_message("AuthReply").unwrap().id, 103);
        let method = file.get_rpc("Auth").unwrap().get_method("Login").unwrap();
        assert_eq!((method.request.as_str(), method.reply.as_str()), ("Login", "AuthReply"));
    }

    #[test]
    fn message_ids_follow_counter() {
        let output = parse("message A\nmessage B:50\nmessage C\nmessage D: 7\nmessage E\n");
        assert!(output.is_ok(), "{}", output.diagnostics);
        let ids: Vec<_> = output.file.messages.iter().map(|m| (m.name.as_str(), m.id)).collect();
        assert_eq!(ids, [("A", 1), ("B", 50), ("C", 51), ("D", 7), ("E", 8)]);
    }

    #[test]
    fn bad_and_duplicate_ids() {
        let output = parse("message A:5\nmessage B:x\nmessage C:5\nmessage D:0\nmessage E:70000\n");
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| &d.kind).collect();
        assert_eq!(lines(&output), [2, 3, 4, 5]);
        assert!(matches!(kinds[0], DiagnosticKind::InvalidMessageId { id, .. } if id == "x"));
        assert!(matches!(kinds[1], DiagnosticKind::DuplicateMessageId { id: 5, other, .. } if other == "A"));
        assert!(matches!(kinds[2], DiagnosticKind::InvalidMessageId { .. }));
        assert!(matches!(kinds[3], DiagnosticKind::InvalidMessageId { .. }));
    }

    #[test]
    fn id_counter_overflow() {
        let output = parse("message A:65535\nmessage B\n");
        assert_eq!(lines(&output), [2]);
        assert_eq!(
            output.diagnostics.0[0].kind,
            DiagnosticKind::IdCounterOverflow("B".to_string())
        );
    }

    #[test]
    fn field_declarations() {
        let output = parse(
            "message M\n\
             \x20 Values int32:4\n\
             \x20 Ratio float64\n\
             \x20 Raw byte : 16\n",
        );
        assert!(output.is_ok(), "{}", output.diagnostics);
        let fields = &output.file.messages[0].fields;
        assert_eq!(fields[0].length, 4);
        assert!(fields[0].is_array());
        assert_eq!(fields[1].ty, FieldType::Primitive(Primitive::Float64));
        assert_eq!(fields[1].length, 0);
        assert_eq!(fields[2].length, 16);
        assert_eq!(fields[2].line, 4);
    }

    #[test]
    fn field_errors() {
        let output = parse(
            "message M\n\
             \x20 Name string\n\
             \x20 lower int8\n\
             \x20 Count int8:\n\
             \x20 Size int8 4\n\
             \x20 Pair int8:2:3\n\
             \x20 Zero int8:0\n\
             \x20 Many string:1:2:3\n\
             \x20 Ok int8\n\
             \x20 Ok int16\n\
             Flat int8\n",
        );
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(lines(&output), [2, 3, 4, 5, 6, 7, 8, 10, 11]);
        assert_eq!(kinds[0], DiagnosticKind::StringWithoutLength("Name".into()));
        assert_eq!(kinds[1], DiagnosticKind::InvalidFieldName("lower".into()));
        assert_eq!(kinds[2], DiagnosticKind::MissingLength("Count".into()));
        assert_eq!(kinds[3], DiagnosticKind::LengthWithoutColon("Size".into()));
        assert!(matches!(kinds[4], DiagnosticKind::UnexpectedCount { .. }));
        assert!(matches!(kinds[5], DiagnosticKind::InvalidLength { .. }));
        assert_eq!(kinds[6], DiagnosticKind::TooManyLengths("Many".into()));
        assert!(matches!(kinds[7], DiagnosticKind::DuplicateField { .. }));
        assert_eq!(kinds[8], DiagnosticKind::FieldNotIndented("Flat".into()));
        assert_eq!(output.file.messages[0].fields.len(), 1);
    }

    #[test]
    fn context_rules() {
        let output = parse(
            "\x20 Orphan int8\n\
             rpc Svc:\n\
             \x20 Field int8\n\
             message M\n\
             \x20 Get(M) M\n",
        );
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::FieldOutsideMessage,
                DiagnosticKind::FieldOutsideMessage,
                DiagnosticKind::MethodOutsideRpc,
            ]
        );
        assert_eq!(lines(&output), [1, 3, 5]);
    }

    #[test]
    fn rejected_header_skips_its_body() {
        let output = parse("message 9Bad\n  A int8\n  B int8\nrpc lower:\n  Get(X) Y\n");
        assert_eq!(lines(&output), [1, 4]);
        assert!(matches!(output.diagnostics.0[0].kind, DiagnosticKind::MalformedMessage(_)));
        assert!(matches!(output.diagnostics.0[1].kind, DiagnosticKind::MalformedRpc(_)));
    }

    #[test]
    fn rejected_header_body_is_still_checked() {
        let output = parse(
            "message 9Bad\n  A int8\n  lower int8\n  C int8:\n  D string\nrpc lower:\n  Get(X) Y\n  Put(X Y\n",
        );
        assert_eq!(lines(&output), [1, 3, 4, 5, 6, 8]);
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(kinds[1], DiagnosticKind::InvalidFieldName("lower".into()));
        assert_eq!(kinds[2], DiagnosticKind::MissingLength("C".into()));
        assert_eq!(kinds[3], DiagnosticKind::StringWithoutLength("D".into()));
        assert!(matches!(kinds[5], DiagnosticKind::MalformedMethod(_)));
        assert!(output.file.messages.is_empty());
        assert!(output.file.rpcs.is_empty());
    }

    #[test]
    fn accumulates_independent_errors() {
        let output = parse(
            "message A\n\
             \x20 X int8\n\
             }\n\
             \x20 Y string\n\
             message B:abc\n",
        );
        assert!(!output.aborted);
        assert_eq!(lines(&output), [3, 4, 5]);
        let err = output.into_result().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("test.kproto:3:"), "{}", text);
        assert!(text.contains("test.kproto:4:"), "{}", text);
        assert!(text.contains("test.kproto:5:"), "{}", text);
    }

    #[test]
    fn late_package_is_fatal() {
        let output = parse("message A\n  X int8\npackage go: p\n}\n  Y Missing\n");
        assert!(output.aborted);
        assert_eq!(lines(&output), [3]);
        assert_eq!(output.diagnostics.0[0].kind, DiagnosticKind::PackageOutOfOrder);
        // The partial model built before the abort is kept.
        assert_eq!(output.file.messages.len(), 1);

        match output.into_result() {
            Err(KprotoError::Parse(failure)) => {
                assert!(failure.fatal);
                assert_eq!(failure.file.messages[0].fields.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn package_forms() {
        let output = parse("package plain\npackage go:gopkg\npackage : nolang\npackage go: again\npackage a b c\n");
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::MissingPackageLang,
                DiagnosticKind::DuplicatePackage("go".into()),
                DiagnosticKind::MalformedPackage("package a b c".into()),
            ]
        );
        assert_eq!(output.file.package_for("java").map(|p| p.name.as_str()), Some("plain"));
    }

    #[test]
    fn strict_package_reports_once() {
        let options = ParseOptions { strict_package: true };
        let output = parse_schema("s.kproto", "message A\nmessage B\n", &options);
        assert_eq!(lines(&output), [1]);
        assert_eq!(output.diagnostics.0[0].kind, DiagnosticKind::MissingPackage);

        let output = parse_schema("s.kproto", "package p\nmessage A\n", &options);
        assert!(output.is_ok());
    }

    #[test]
    fn duplicates_are_reported() {
        let output = parse("message A\nmessage A\nrpc S:\n  Get(A) A\n  Get(A) A\nrpc S:\n");
        let kinds: Vec<_> = output.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::DuplicateMessage("A".into()),
                DiagnosticKind::DuplicateMethod { rpc: "S".into(), method: "Get".into() },
                DiagnosticKind::DuplicateRpc("S".into()),
            ]
        );
    }

    #[test]
    fn unknown_lines() {
        let output = parse("message A\n  X int8\n{\n  ;\n");
        assert_eq!(lines(&output), [3, 4]);
        assert_eq!(output.diagnostics.0[0].kind, DiagnosticKind::UnknownLine("{".into()));
    }

    #[test]
    fn crlf_and_trailing_comments() {
        let output = parse("message A:3 // first\r\n  X uint16:2 // pair\r\nrpc R: // svc\r\n  Do(A) A // call\r\n");
        assert!(output.is_ok(), "{}", output.diagnostics);
        assert_eq!(output.file.messages[0].fields[0].length, 2);
        assert_eq!(output.file.rpcs[0].methods.len(), 1);
    }
}
