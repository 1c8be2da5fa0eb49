//! Identifier case conversions between proto and Rust naming conventions.

/// Convert a string to snake_case.
///
/// Handles consecutive uppercase letters correctly:
/// - "HTTPServer" -> "http_server"
/// - "myField" -> "my_field"
/// - "TokenID" -> "token_id"
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
                let prev_upper = chars[i - 1].is_uppercase();
                let next_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);
                if prev_lower || (prev_upper && next_lower) {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert snake_case or camelCase to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Convert a camelCase or snake_case name to UPPER_SNAKE, the form oneof
/// discriminants and the cycle-break set use.
pub fn to_upper_snake(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Convert an UPPER_SNAKE enum value name to a Rust variant name.
pub fn to_variant_name(s: &str) -> String {
    to_pascal_case(&s.to_lowercase())
}

/// Convert a proto field name to a Rust field/method name.
pub fn to_rust_field_name(name: &str) -> String {
    let snake = to_snake_case(name);
    if is_rust_keyword(&snake) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// Convert a proto name to a Rust module (file) name.
pub fn to_module_name(name: &str) -> String {
    let snake: String = to_snake_case(name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if is_rust_keyword(&snake) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// Check if a string is a Rust keyword.
fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("myField"), "my_field");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("AccountID"), "account_id");
        assert_eq!(to_snake_case("my_field"), "my_field");
        assert_eq!(to_snake_case("MyMessage"), "my_message");
        assert_eq!(to_snake_case("ID"), "id");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("foo"), "Foo");
        assert_eq!(to_pascal_case("foo_bar"), "FooBar");
        assert_eq!(to_pascal_case("FOO"), "FOO");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_to_upper_snake() {
        assert_eq!(to_upper_snake("thresholdKey"), "THRESHOLD_KEY");
        assert_eq!(to_upper_snake("keyList"), "KEY_LIST");
        assert_eq!(to_upper_snake("ed25519"), "ED25519");
    }

    #[test]
    fn test_to_variant_name() {
        assert_eq!(to_variant_name("KIND_UNSPECIFIED"), "KindUnspecified");
        assert_eq!(to_variant_name("MOBILE"), "Mobile");
    }

    #[test]
    fn test_keyword_escaping() {
        assert_eq!(to_rust_field_name("type"), "r#type");
        assert_eq!(to_rust_field_name("match"), "r#match");
        assert_eq!(to_rust_field_name("name"), "name");
        assert_eq!(to_module_name("Loop"), "r#loop");
    }
}
