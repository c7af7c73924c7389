/// Quote `text` the way JSON would, for use in messages.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

/// Whether `s` can be used as a Rust identifier as is.
pub fn is_rust_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some('_') => s.len() > 1 && chars.all(|c| c.is_alphanumeric() || c == '_'),
        Some(first) if first.is_alphabetic() => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Converts a string to PascalCase.
/// - Underscore-separated words are capitalised and joined, the rest of
///   each word lowercased.
/// - A fully uppercase word keeps only its first letter uppercase.
/// - Otherwise only the first letter is forced to uppercase.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalise(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalise(word, true))
            .collect()
    } else {
        capitalise(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case.
/// Runs of uppercase letters stay together, so "LastIP" becomes "last_ip"
/// and "HTTPServer" becomes "http_server".
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_'
                    && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// SCREAMING_SNAKE_CASE, used for generated constants.
pub fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Appends an underscore to identifiers that collide with Rust keywords,
/// strict or reserved.
pub fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn",
        "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
        "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
        "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while",
        // reserved
        "abstract", "become", "box", "do", "final", "gen", "macro", "override",
        "priv", "try", "typeof", "unsized", "virtual", "yield",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

#[test]
fn test_quote() {
    assert_eq!(quote("a\"b"), "\"a\\\"b\"");
}

#[test]
fn test_case_conversion() {
    assert_eq!(to_pascal_case("login_reply"), "LoginReply");
    assert_eq!(to_pascal_case("SIGNAL"), "Signal");
    assert_eq!(to_pascal_case("authMsg"), "AuthMsg");
    assert_eq!(to_snake_case("UserName"), "user_name");
    assert_eq!(to_snake_case("ID"), "id");
    assert_eq!(to_snake_case("LastIP"), "last_ip");
    assert_eq!(to_snake_case("HTTPServer"), "http_server");
    assert_eq!(to_snake_case("Field_Two"), "field_two");
    assert_eq!(to_screaming_snake_case("LoginReply"), "LOGIN_REPLY");
    assert_eq!(escape_rust_keyword("type"), "type_");
    assert_eq!(escape_rust_keyword("kind"), "kind");
    assert_eq!(escape_rust_keyword("box"), "box_");
    assert_eq!(escape_rust_keyword("try"), "try_");
    assert_eq!(escape_rust_keyword("Self"), "Self_");
}

#[test]
fn test_is_rust_identifier() {
    assert!(is_rust_identifier("AuthMsg"));
    assert!(is_rust_identifier("_x1"));
    assert!(!is_rust_identifier(""));
    assert!(!is_rust_identifier("_"));
    assert!(!is_rust_identifier("1st"));
}
