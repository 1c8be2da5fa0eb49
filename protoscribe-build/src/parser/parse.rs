//! Recursive-descent parser for proto3.
//!
//! The grammar follows the proto3 language spec for the constructs this
//! compiler keeps: `syntax`, `package`, `import`, `option`, `message`, `enum`,
//! oneofs, map fields, `reserved` blocks, and field options. Constructs
//! outside that set (`service`, `extend`, ...) parse as [`MessageElement::Unknown`]
//! or are skipped at file level with a balanced scan, so one stray element
//! never cascades into bogus errors.

use super::ast::*;
use super::lexer::{Lexer, Span, Token, TokenKind};
use super::ParseError;

/// Parses one proto3 source file.
pub fn parse_proto(source: &str) -> Result<ProtoFileAst, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser { tokens, index: 0 }.parse_file()
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn parse_file(mut self) -> Result<ProtoFileAst, ParseError> {
        let mut file = ProtoFileAst::default();

        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Eof => return Ok(file),
                TokenKind::Punct(';') => {
                    self.advance();
                }
                TokenKind::Ident(word) => match word.as_str() {
                    "syntax" => {
                        self.advance();
                        self.expect_punct('=')?;
                        let syntax = self.expect_string()?;
                        self.expect_punct(';')?;
                        if syntax != "proto3" {
                            return Err(self.error_at(
                                token.span,
                                format!("unsupported syntax '{syntax}', expected \"proto3\""),
                            ));
                        }
                        file.syntax = Some(syntax);
                    }
                    "package" => {
                        self.advance();
                        let name = self.parse_dotted_ident()?;
                        self.expect_punct(';')?;
                        file.package = Some(name);
                    }
                    "import" => {
                        self.advance();
                        // Optional modifier.
                        if matches!(self.peek().ident(), Some("public" | "weak")) {
                            self.advance();
                        }
                        let path = self.expect_string()?;
                        self.expect_punct(';')?;
                        file.imports.push(path);
                    }
                    "option" => {
                        let option = self.parse_option()?;
                        file.options.push(option);
                    }
                    "message" => {
                        let message = self.parse_message()?;
                        file.messages.push(message);
                    }
                    "enum" => {
                        let enumeration = self.parse_enum()?;
                        file.enums.push(enumeration);
                    }
                    other => {
                        return Err(self.error_at(
                            token.span,
                            format!("unexpected top-level element '{other}'"),
                        ));
                    }
                },
                _ => {
                    return Err(self.error_at(
                        token.span,
                        format!("unexpected token {}", token.describe()),
                    ));
                }
            }
        }
    }

    fn parse_message(&mut self) -> Result<MessageAst, ParseError> {
        let keyword = self.expect_keyword("message")?;
        let name = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut elements = Vec::new();
        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Punct('}') => {
                    self.advance();
                    break;
                }
                TokenKind::Punct(';') => {
                    self.advance();
                }
                TokenKind::Ident(word) => match word.as_str() {
                    "message" => elements.push(MessageElement::Message(self.parse_message()?)),
                    "enum" => elements.push(MessageElement::Enum(self.parse_enum()?)),
                    "oneof" => elements.push(MessageElement::Oneof(self.parse_oneof()?)),
                    "map" => elements.push(MessageElement::Map(self.parse_map_field()?)),
                    "option" => elements.push(MessageElement::Option(self.parse_option()?)),
                    "reserved" => {
                        self.advance();
                        self.skip_to_semicolon();
                        elements.push(MessageElement::Reserved(token.span));
                    }
                    "extensions" | "extend" | "group" => {
                        self.advance();
                        self.skip_unknown_element();
                        elements.push(MessageElement::Unknown {
                            keyword: word.clone(),
                            span: token.span,
                        });
                    }
                    _ => elements.push(MessageElement::Field(self.parse_field()?)),
                },
                // A field whose type reference starts with a leading dot.
                TokenKind::Punct('.') => {
                    elements.push(MessageElement::Field(self.parse_field()?));
                }
                TokenKind::Eof => {
                    return Err(self.error_at(
                        token.span,
                        format!("unexpected end of file inside message '{name}'"),
                    ));
                }
                _ => {
                    return Err(self.error_at(
                        token.span,
                        format!("unexpected token {} in message body", token.describe()),
                    ));
                }
            }
        }

        Ok(MessageAst {
            name,
            doc: keyword.comment,
            span: keyword.span,
            elements,
        })
    }

    fn parse_field(&mut self) -> Result<FieldAst, ParseError> {
        let first = self.peek().clone();
        let doc = first.comment.clone();

        let mut repeated = false;
        let mut optional = false;
        match self.peek().ident() {
            Some("repeated") => {
                repeated = true;
                self.advance();
            }
            Some("optional") => {
                optional = true;
                self.advance();
            }
            _ => {}
        }

        let type_name = self.parse_dotted_ident()?;
        let name = self.expect_ident()?;
        self.expect_punct('=')?;
        let number = self.expect_field_number()?;
        let options = self.parse_field_options()?;
        self.expect_punct(';')?;

        Ok(FieldAst {
            repeated,
            optional,
            type_name,
            name,
            number,
            options,
            doc,
            span: first.span,
        })
    }

    fn parse_oneof(&mut self) -> Result<OneofAst, ParseError> {
        let keyword = self.expect_keyword("oneof")?;
        let name = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut fields = Vec::new();
        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Punct('}') => {
                    self.advance();
                    break;
                }
                TokenKind::Punct(';') => {
                    self.advance();
                }
                TokenKind::Ident(word) if word == "option" => {
                    // Oneof options are not interpreted; the model layer warns.
                    self.parse_option()?;
                }
                TokenKind::Ident(_) => fields.push(self.parse_field()?),
                _ => {
                    return Err(self.error_at(
                        token.span,
                        format!("unexpected token {} in oneof '{name}'", token.describe()),
                    ));
                }
            }
        }

        Ok(OneofAst {
            name,
            doc: keyword.comment,
            fields,
            span: keyword.span,
        })
    }

    fn parse_map_field(&mut self) -> Result<MapFieldAst, ParseError> {
        let keyword = self.expect_keyword("map")?;
        self.expect_punct('<')?;
        let key_type = self.parse_dotted_ident()?;
        self.expect_punct(',')?;
        let value_type = self.parse_dotted_ident()?;
        self.expect_punct('>')?;
        let name = self.expect_ident()?;
        self.expect_punct('=')?;
        let number = self.expect_field_number()?;
        self.parse_field_options()?;
        self.expect_punct(';')?;

        Ok(MapFieldAst {
            key_type,
            value_type,
            name,
            number,
            span: keyword.span,
        })
    }

    fn parse_enum(&mut self) -> Result<EnumAst, ParseError> {
        let keyword = self.expect_keyword("enum")?;
        let name = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut values = Vec::new();
        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Punct('}') => {
                    self.advance();
                    break;
                }
                TokenKind::Punct(';') => {
                    self.advance();
                }
                TokenKind::Ident(word) if word == "option" => {
                    self.parse_option()?;
                }
                TokenKind::Ident(word) if word == "reserved" => {
                    self.advance();
                    self.skip_to_semicolon();
                }
                TokenKind::Ident(_) => {
                    let value_doc = token.comment.clone();
                    let value_name = self.expect_ident()?;
                    self.expect_punct('=')?;
                    let number = match self.advance().kind.clone() {
                        TokenKind::IntLit(n) if i32::try_from(n).is_ok() => n as i32,
                        _ => {
                            return Err(self.error_at(
                                token.span,
                                format!("invalid number for enum value '{value_name}'"),
                            ));
                        }
                    };
                    let options = self.parse_field_options()?;
                    self.expect_punct(';')?;
                    let deprecated = options
                        .iter()
                        .any(|o| o.name == "deprecated" && o.value == "true");
                    values.push(EnumValueAst {
                        name: value_name,
                        number,
                        deprecated,
                        doc: value_doc,
                    });
                }
                _ => {
                    return Err(self.error_at(
                        token.span,
                        format!("unexpected token {} in enum '{name}'", token.describe()),
                    ));
                }
            }
        }

        Ok(EnumAst {
            name,
            doc: keyword.comment,
            values,
            span: keyword.span,
        })
    }

    fn parse_option(&mut self) -> Result<OptionAst, ParseError> {
        let keyword = self.expect_keyword("option")?;
        let name = self.parse_option_name()?;
        self.expect_punct('=')?;
        let value = self.parse_constant()?;
        self.expect_punct(';')?;
        Ok(OptionAst {
            name,
            value,
            span: keyword.span,
        })
    }

    /// `name`, `a.b.c`, or `(custom.option).field`.
    fn parse_option_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if matches!(self.peek().kind, TokenKind::Punct('(')) {
            self.advance();
            name.push('(');
            name.push_str(&self.parse_dotted_ident()?);
            self.expect_punct(')')?;
            name.push(')');
        } else {
            name.push_str(&self.parse_dotted_ident()?);
            return Ok(name);
        }
        while matches!(self.peek().kind, TokenKind::Punct('.')) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    fn parse_constant(&mut self) -> Result<String, ParseError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::StrLit(s) => Ok(s),
            TokenKind::IntLit(n) => Ok(n.to_string()),
            TokenKind::FloatLit(s) => Ok(s),
            TokenKind::Ident(s) => Ok(s),
            _ => Err(self.error_at(
                token.span,
                format!("expected constant but found {}", token.describe()),
            )),
        }
    }

    /// `[name = constant, name = constant]`, or nothing.
    fn parse_field_options(&mut self) -> Result<Vec<OptionAst>, ParseError> {
        let mut options = Vec::new();
        if !matches!(self.peek().kind, TokenKind::Punct('[')) {
            return Ok(options);
        }
        self.advance();
        loop {
            let span = self.peek().span;
            let name = self.parse_option_name()?;
            self.expect_punct('=')?;
            let value = self.parse_constant()?;
            options.push(OptionAst { name, value, span });
            match self.advance().kind.clone() {
                TokenKind::Punct(',') => continue,
                TokenKind::Punct(']') => return Ok(options),
                _ => {
                    return Err(self.error_at(span, "expected ',' or ']' in field options".into()));
                }
            }
        }
    }

    fn parse_dotted_ident(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if matches!(self.peek().kind, TokenKind::Punct('.')) {
            self.advance();
            name.push('.');
        }
        name.push_str(&self.expect_ident()?);
        while matches!(self.peek().kind, TokenKind::Punct('.')) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    /// Consumes either a `{}`-balanced block or a `;`-terminated statement.
    fn skip_unknown_element(&mut self) {
        let mut depth = 0usize;
        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Punct('{') => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Punct('}') => {
                    self.advance();
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Punct(';') if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_to_semicolon(&mut self) {
        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Punct(';') => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.index];
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::Ident(s) => Ok(s),
            _ => Err(self.error_at(
                token.span,
                format!("expected identifier but found {}", token.describe()),
            )),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Token, ParseError> {
        let token = self.advance().clone();
        if token.ident() == Some(keyword) {
            Ok(token)
        } else {
            Err(self.error_at(
                token.span,
                format!("expected '{keyword}' but found {}", token.describe()),
            ))
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<(), ParseError> {
        let token = self.advance().clone();
        if token.kind == TokenKind::Punct(punct) {
            Ok(())
        } else {
            Err(self.error_at(
                token.span,
                format!("expected '{punct}' but found {}", token.describe()),
            ))
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::StrLit(s) => Ok(s),
            _ => Err(self.error_at(
                token.span,
                format!("expected string literal but found {}", token.describe()),
            )),
        }
    }

    fn expect_field_number(&mut self) -> Result<u32, ParseError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::IntLit(n) if n > 0 && u32::try_from(n).is_ok() => Ok(n as u32),
            _ => Err(self.error_at(
                token.span,
                format!("expected field number but found {}", token.describe()),
            )),
        }
    }

    fn error_at(&self, span: Span, message: String) -> ParseError {
        ParseError {
            line: span.line,
            column: span.column,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_file() {
        let file = parse_proto(
            r#"
            syntax = "proto3";
            package game.state;
            import "other.proto";
            option java_package = "com.example.game";

            /// A player in the world.
            message Player {
                /// Display name.
                string name = 1;
                int32 score = 2;
                repeated int64 inventory = 3;
            }
            "#,
        )
        .unwrap();

        assert_eq!(file.syntax.as_deref(), Some("proto3"));
        assert_eq!(file.package.as_deref(), Some("game.state"));
        assert_eq!(file.imports, vec!["other.proto"]);
        assert_eq!(file.options[0].name, "java_package");
        assert_eq!(file.options[0].value, "com.example.game");

        let msg = &file.messages[0];
        assert_eq!(msg.name, "Player");
        assert_eq!(msg.doc.as_deref(), Some("A player in the world."));
        let fields: Vec<_> = msg
            .elements
            .iter()
            .filter_map(|e| match e {
                MessageElement::Field(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "name");
        assert_eq!(fields[0].doc.as_deref(), Some("Display name."));
        assert_eq!(fields[1].number, 2);
        assert!(fields[2].repeated);
    }

    #[test]
    fn parse_oneof_and_nested() {
        let file = parse_proto(
            r#"
            syntax = "proto3";
            message Outer {
                message Inner { int32 x = 1; }
                enum Kind { KIND_UNSPECIFIED = 0; KIND_OTHER = 1; }
                oneof payload {
                    string text = 4;
                    Inner inner = 5;
                }
            }
            "#,
        )
        .unwrap();

        let msg = &file.messages[0];
        let mut saw_message = false;
        let mut saw_enum = false;
        let mut saw_oneof = false;
        for element in &msg.elements {
            match element {
                MessageElement::Message(m) => {
                    assert_eq!(m.name, "Inner");
                    saw_message = true;
                }
                MessageElement::Enum(e) => {
                    assert_eq!(e.values.len(), 2);
                    saw_enum = true;
                }
                MessageElement::Oneof(o) => {
                    assert_eq!(o.name, "payload");
                    assert_eq!(o.fields.len(), 2);
                    assert_eq!(o.fields[1].type_name, "Inner");
                    saw_oneof = true;
                }
                _ => {}
            }
        }
        assert!(saw_message && saw_enum && saw_oneof);
    }

    #[test]
    fn parse_map_and_reserved() {
        let file = parse_proto(
            r#"
            syntax = "proto3";
            message Table {
                reserved 2, 3;
                reserved "old_name";
                map<string, int64> scores = 1;
            }
            "#,
        )
        .unwrap();

        let msg = &file.messages[0];
        let maps: Vec<_> = msg
            .elements
            .iter()
            .filter_map(|e| match e {
                MessageElement::Map(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].key_type, "string");
        assert_eq!(maps[0].value_type, "int64");
    }

    #[test]
    fn parse_deprecated_field_option() {
        let file = parse_proto(
            r#"
            syntax = "proto3";
            message M { int32 old = 1 [deprecated = true]; }
            "#,
        )
        .unwrap();
        let MessageElement::Field(field) = &file.messages[0].elements[0] else {
            panic!("expected field");
        };
        assert_eq!(field.options[0].name, "deprecated");
        assert_eq!(field.options[0].value, "true");
    }

    #[test]
    fn syntax_error_reports_location() {
        let err = parse_proto("syntax = \"proto3\";\nmessage M {\n  int32 = 1;\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("expected identifier"));
    }

    #[test]
    fn proto2_syntax_rejected() {
        let err = parse_proto("syntax = \"proto2\";").unwrap_err();
        assert!(err.message.contains("proto3"));
    }

    #[test]
    fn unknown_element_is_preserved() {
        let file = parse_proto(
            r#"
            syntax = "proto3";
            message M {
                extensions 100 to 199;
                int32 x = 1;
            }
            "#,
        )
        .unwrap();
        assert!(matches!(
            &file.messages[0].elements[0],
            MessageElement::Unknown { keyword, .. } if keyword == "extensions"
        ));
        assert!(matches!(
            &file.messages[0].elements[1],
            MessageElement::Field(f) if f.name == "x"
        ));
    }
}
