//! Tokenizer for proto3 schema files.
//!
//! Comments are not thrown away: the text of the comment run immediately
//! preceding a token rides along on that token, so the parser can attach it as
//! the doc comment of the declaration the token opens.

use super::ParseError;

/// A source location, 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident(String),
    /// Integer literal, possibly negative.
    IntLit(i64),
    /// Floating point literal, kept as written.
    FloatLit(String),
    /// Quoted string literal, unescaped.
    StrLit(String),
    /// Single punctuation character: `{ } [ ] < > ( ) = ; , . -`
    Punct(char),
    /// End of input.
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Text of the comment run directly above this token, if any.
    pub comment: Option<String>,
}

impl Token {
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(s) => format!("'{s}'"),
            TokenKind::IntLit(n) => format!("'{n}'"),
            TokenKind::FloatLit(s) => format!("'{s}'"),
            TokenKind::StrLit(s) => format!("\"{s}\""),
            TokenKind::Punct(c) => format!("'{c}'"),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input, ending with a single [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut pending_comment: Vec<String> = Vec::new();

        loop {
            self.skip_spaces();

            let span = self.span();
            let Some(&c) = self.chars.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span,
                    comment: take_comment(&mut pending_comment),
                });
                return Ok(tokens);
            };

            if c == '/' {
                self.read_comment(&mut pending_comment)?;
                continue;
            }

            let kind = if c == '"' || c == '\'' {
                self.read_string()?
            } else if c.is_ascii_digit() {
                self.read_number(false)?
            } else if c == '-' {
                self.bump();
                match self.chars.peek() {
                    Some(d) if d.is_ascii_digit() => self.read_number(true)?,
                    _ => TokenKind::Punct('-'),
                }
            } else if c == '_' || c.is_ascii_alphabetic() {
                self.read_ident()
            } else if "{}[]<>()=;,.".contains(c) {
                self.bump();
                TokenKind::Punct(c)
            } else {
                return Err(ParseError {
                    line: span.line,
                    column: span.column,
                    message: format!("unexpected character '{c}'"),
                });
            };

            tokens.push(Token {
                kind,
                span,
                comment: take_comment(&mut pending_comment),
            });
        }
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn read_comment(&mut self, pending: &mut Vec<String>) -> Result<(), ParseError> {
        let span = self.span();
        self.bump(); // '/'
        match self.chars.peek() {
            Some('/') => {
                self.bump();
                // Doc comments use '///'; the extra slash is not content.
                if self.chars.peek() == Some(&'/') {
                    self.bump();
                }
                let mut text = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                pending.push(text.trim().to_string());
                Ok(())
            }
            Some('*') => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('*') if self.chars.peek() == Some(&'/') => {
                            self.bump();
                            break;
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Err(ParseError {
                                line: span.line,
                                column: span.column,
                                message: "unterminated block comment".to_string(),
                            });
                        }
                    }
                }
                for line in text.lines() {
                    let cleaned = line.trim().trim_start_matches('*').trim();
                    if !cleaned.is_empty() {
                        pending.push(cleaned.to_string());
                    }
                }
                Ok(())
            }
            _ => Err(ParseError {
                line: span.line,
                column: span.column,
                message: "unexpected character '/'".to_string(),
            }),
        }
    }

    fn read_string(&mut self) -> Result<TokenKind, ParseError> {
        let span = self.span();
        let quote = self.bump().expect("peeked");
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(TokenKind::StrLit(text)),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => text.push(c),
            }
        }
        Err(ParseError {
            line: span.line,
            column: span.column,
            message: "unterminated string literal".to_string(),
        })
    }

    fn read_number(&mut self, negative: bool) -> Result<TokenKind, ParseError> {
        let span = self.span();
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        let mut is_float = false;
        let mut is_hex = false;
        while let Some(&c) = self.chars.peek() {
            let accept = if c.is_ascii_digit() {
                true
            } else if (c == 'x' || c == 'X') && matches!(text.as_str(), "0" | "-0") {
                is_hex = true;
                true
            } else if is_hex && c.is_ascii_hexdigit() {
                true
            } else if !is_hex && (c == '.' || c == 'e' || c == 'E') {
                is_float = true;
                true
            } else if (c == '+' || c == '-') && matches!(text.chars().last(), Some('e' | 'E')) {
                // Exponent sign; only valid directly after the marker.
                true
            } else {
                false
            };
            if !accept {
                break;
            }
            text.push(c);
            self.bump();
        }
        if is_float {
            return Ok(TokenKind::FloatLit(text));
        }
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(hex) = text.strip_prefix("-0x") {
            i64::from_str_radix(hex, 16).ok().map(|v| -v)
        } else {
            text.parse::<i64>().ok()
        };
        match value {
            Some(value) => Ok(TokenKind::IntLit(value)),
            None => Err(ParseError {
                line: span.line,
                column: span.column,
                message: format!("invalid numeric literal '{text}'"),
            }),
        }
    }

    fn read_ident(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '_' || c.is_ascii_alphanumeric() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(text)
    }
}

fn take_comment(pending: &mut Vec<String>) -> Option<String> {
    if pending.is_empty() {
        None
    } else {
        Some(std::mem::take(pending).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    #[test]
    fn tokenize_simple_field() {
        let tokens = lex("int32 x = 10;");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("int32".into()),
                TokenKind::Ident("x".into()),
                TokenKind::Punct('='),
                TokenKind::IntLit(10),
                TokenKind::Punct(';'),
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].span, Span { line: 1, column: 1 });
        assert_eq!(tokens[1].span, Span { line: 1, column: 7 });
        assert_eq!(tokens[3].span, Span { line: 1, column: 11 });
    }

    #[test]
    fn comment_attaches_to_next_token() {
        let tokens = lex("// Player state.\n// Mutable.\nmessage Player {}");
        assert_eq!(tokens[0].ident(), Some("message"));
        assert_eq!(
            tokens[0].comment.as_deref(),
            Some("Player state.\nMutable.")
        );
        // The comment is consumed; later tokens carry nothing.
        assert_eq!(tokens[1].comment, None);
    }

    #[test]
    fn block_comment_attaches() {
        let tokens = lex("/*\n * A thing.\n */\nenum Kind {}");
        assert_eq!(tokens[0].ident(), Some("enum"));
        assert_eq!(tokens[0].comment.as_deref(), Some("A thing."));
    }

    #[test]
    fn string_literals_unescape() {
        let tokens = lex(r#"option java_package = "com.example";"#);
        assert_eq!(tokens[3].kind, TokenKind::StrLit("com.example".into()));
    }

    #[test]
    fn negative_numbers() {
        let tokens = lex("FOO = -1;");
        assert_eq!(tokens[2].kind, TokenKind::IntLit(-1));
    }

    #[test]
    fn line_tracking_spans_lines() {
        let tokens = lex("a\n  b");
        assert_eq!(tokens[0].span, Span { line: 1, column: 1 });
        assert_eq!(tokens[1].span, Span { line: 2, column: 3 });
    }

    #[test]
    fn unexpected_character_is_located() {
        let err = Lexer::new("int32 x = 10 @").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 14);
    }
}
