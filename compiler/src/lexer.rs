use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref SPACE_LINE:   Regex = Regex::new(r"^\s*$").unwrap();
    static ref COMMENT_LINE: Regex = Regex::new(r"^\s*//").unwrap();
    static ref PACKAGE_LINE: Regex = Regex::new(r"^\s*package\s+").unwrap();
    static ref MESSAGE_LINE: Regex = Regex::new(r"^\s*message\s+").unwrap();
    static ref RPC_LINE:     Regex = Regex::new(r"^\s*rpc\s+").unwrap();
    static ref METHOD_LINE:  Regex = Regex::new(r"^\s*\w+\s*\(").unwrap();
    static ref FIELD_LINE:   Regex = Regex::new(r"^\s*\w+\s+\w+").unwrap();
}

/// The shape of one schema line, decided before it is parsed in detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineKind {
    Unknown,
    Comment,
    Package,
    Message,
    Field,
    Rpc,
    Method,
    SpaceLine,
}

impl LineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineKind::Unknown => "unknown",
            LineKind::Comment => "comment",
            LineKind::Package => "package",
            LineKind::Message => "message",
            LineKind::Field => "field",
            LineKind::Rpc => "rpc",
            LineKind::Method => "method",
            LineKind::SpaceLine => "space",
        }
    }
}

/// Classify a line. The first matching rule wins, so a line that looks like
/// both a method and a field is a method.
pub fn classify_line(line: &str) -> LineKind {
    let rules: [(&Regex, LineKind); 7] = [
        (&*SPACE_LINE, LineKind::SpaceLine),
        (&*COMMENT_LINE, LineKind::Comment),
        (&*PACKAGE_LINE, LineKind::Package),
        (&*MESSAGE_LINE, LineKind::Message),
        (&*RPC_LINE, LineKind::Rpc),
        (&*METHOD_LINE, LineKind::Method),
        (&*FIELD_LINE, LineKind::Field),
    ];
    rules
        .iter()
        .find(|(re, _)| re.is_match(line))
        .map(|(_, kind)| *kind)
        .unwrap_or(LineKind::Unknown)
}

#[test]
fn classify_each_kind() {
    assert_eq!(classify_line(""), LineKind::SpaceLine);
    assert_eq!(classify_line("   \t"), LineKind::SpaceLine);
    assert_eq!(classify_line("  // note"), LineKind::Comment);
    assert_eq!(classify_line("package go: login"), LineKind::Package);
    assert_eq!(classify_line("message Login: 100"), LineKind::Message);
    assert_eq!(classify_line("rpc Auth:"), LineKind::Rpc);
    assert_eq!(classify_line("    Login(Login) LoginReply"), LineKind::Method);
    assert_eq!(classify_line("    UserName string:32"), LineKind::Field);
    assert_eq!(classify_line("}"), LineKind::Unknown);
    assert_eq!(classify_line("package"), LineKind::Unknown);
}

#[test]
fn classify_first_rule_wins() {
    // Keywords are matched before the generic field shape.
    assert_eq!(classify_line("message Foo"), LineKind::Message);
    assert_eq!(classify_line("    // Field int8"), LineKind::Comment);
    // A method line also has the field shape.
    assert_eq!(classify_line("Get (Req) Rep"), LineKind::Method);
    // Keywords are case sensitive.
    assert_eq!(classify_line("    Message int8"), LineKind::Field);
}
