//! Hand-written scanner for the shading language.
//!
//! Breaks a source string into a flat `Vec<Token>`; every token carries the
//! byte range it was scanned from. Keywords are recognised here, but type
//! names (`vec3`, `mat4`, ...) come out as plain `Ident`s and are interpreted
//! during parsing. Whitespace and `//` / `/* */` comments are discarded.
//! Unrecognised characters are reported to the log and scanning continues.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::compiler::log::Log;
use crate::compiler::source::{Range, SourceRef};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntLiteral(i32),
    FloatLiteral(f32),
    StringLiteral(String), // "path" after #include

    // Keywords
    Attribute,
    Break,
    Const,
    Continue,
    Discard,
    Do,
    Else,
    Export,
    False,
    For,
    If,
    Return,
    Struct,
    True,
    Uniform,
    Varying,
    Void,
    While,

    // Directives
    Extension, // '#extension'
    Include,   // '#include'

    // Punctuation and operators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Question,
    Dot,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Increment,
    Decrement,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Not,

    EndOfFile,
}

#[derive(Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range,
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "attribute" => TokenKind::Attribute,
        "break" => TokenKind::Break,
        "const" => TokenKind::Const,
        "continue" => TokenKind::Continue,
        "discard" => TokenKind::Discard,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "export" => TokenKind::Export,
        "false" => TokenKind::False,
        "for" => TokenKind::For,
        "if" => TokenKind::If,
        "return" => TokenKind::Return,
        "struct" => TokenKind::Struct,
        "true" => TokenKind::True,
        "uniform" => TokenKind::Uniform,
        "varying" => TokenKind::Varying,
        "void" => TokenKind::Void,
        "while" => TokenKind::While,
        _ => return None,
    };
    Some(kind)
}

/// Tokenize one source. Invoked once per source; the result is cached by the
/// compile session so multi-pass compiles never re-scan.
pub fn tokenize(log: &mut Log, source: &SourceRef) -> Vec<Token> {
    Lexer {
        source,
        chars: source.contents.char_indices().peekable(),
        end: source.contents.len(),
        log,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    source: &'a SourceRef,
    chars: Peekable<CharIndices<'a>>,
    end: usize,
    log: &'a mut Log,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Vec<Token> {
        while let Some((start, c)) = self.chars.next() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {}
                '/' if self.eat('/') => self.skip_line(),
                '/' if self.eat('*') => self.skip_block_comment(start),
                _ => self.scan(start, c),
            }
        }
        self.push(TokenKind::EndOfFile, self.end, self.end);
        self.tokens
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.end)
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.chars.peek() {
            Some(&(_, c)) if c == expected => {
                self.chars.next();
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            range: Range::new(self.source, start, end),
        });
    }

    fn skip_line(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn skip_block_comment(&mut self, start: usize) {
        loop {
            match self.chars.next() {
                Some((_, '*')) if self.eat('/') => return,
                Some(_) => {}
                None => {
                    let range = Range::new(self.source, start, self.end);
                    self.log.error(range, "unterminated block comment");
                    return;
                }
            }
        }
    }

    fn scan(&mut self, start: usize, c: char) {
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '+' if self.eat('+') => TokenKind::Increment,
            '+' if self.eat('=') => TokenKind::PlusAssign,
            '+' => TokenKind::Plus,
            '-' if self.eat('-') => TokenKind::Decrement,
            '-' if self.eat('=') => TokenKind::MinusAssign,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarAssign,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashAssign,
            '/' => TokenKind::Slash,
            '=' if self.eat('=') => TokenKind::Equal,
            '=' => TokenKind::Assign,
            '!' if self.eat('=') => TokenKind::NotEqual,
            '!' => TokenKind::Not,
            '<' if self.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '|' if self.eat('|') => TokenKind::OrOr,
            '"' => return self.scan_string(start),
            '#' => return self.scan_directive(start),
            '.' => {
                // A dot starts a float only when a digit follows; otherwise
                // it is member access.
                match self.chars.peek() {
                    Some(&(_, d)) if d.is_ascii_digit() => return self.scan_number(start, '.'),
                    _ => TokenKind::Dot,
                }
            }
            d if d.is_ascii_digit() => return self.scan_number(start, d),
            a if a.is_ascii_alphabetic() || a == '_' => return self.scan_ident(start, a),
            other => {
                let end = self.pos();
                let range = Range::new(self.source, start, end);
                self.log
                    .error(range, format!("unexpected character '{}'", other));
                return;
            }
        };
        let end = self.pos();
        self.push(kind, start, end);
    }

    fn scan_ident(&mut self, start: usize, first: char) {
        let mut ident = String::new();
        ident.push(first);
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let end = self.pos();
        let kind = keyword(&ident).unwrap_or(TokenKind::Ident(ident));
        self.push(kind, start, end);
    }

    fn scan_number(&mut self, start: usize, first: char) {
        let mut text = String::new();
        let mut is_float = first == '.';
        text.push(first);
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.chars.next();
                    if let Some(&(_, s)) = self.chars.peek() {
                        if s == '+' || s == '-' {
                            text.push(s);
                            self.chars.next();
                        }
                    }
                    continue;
                }
                _ => break,
            }
            self.chars.next();
        }
        let end = self.pos();
        let range = Range::new(self.source, start, end);
        if is_float {
            match text.parse::<f32>() {
                Ok(v) if v.is_finite() => self.push(TokenKind::FloatLiteral(v), start, end),
                _ => self
                    .log
                    .error(range, format!("float literal '{}' is out of range", text)),
            }
        } else {
            match text.parse::<i32>() {
                Ok(v) => self.push(TokenKind::IntLiteral(v), start, end),
                Err(_) => self.log.error(range, format!("integer literal '{}' is out of range", text)),
            }
        }
    }

    fn scan_string(&mut self, start: usize) {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => break,
                Some((_, '\n')) | None => {
                    let range = Range::new(self.source, start, self.pos());
                    self.log.error(range, "unterminated string literal");
                    break;
                }
                Some((_, c)) => text.push(c),
            }
        }
        let end = self.pos();
        self.push(TokenKind::StringLiteral(text), start, end);
    }

    fn scan_directive(&mut self, start: usize) {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let end = self.pos();
        let kind = match name.as_str() {
            "extension" => TokenKind::Extension,
            "include" => TokenKind::Include,
            _ => {
                let range = Range::new(self.source, start, end);
                self.log
                    .error(range, format!("unknown directive '#{}'", name));
                return;
            }
        };
        self.push(kind, start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::source::Source;

    fn kinds(text: &str) -> (Vec<TokenKind>, Log) {
        let mut log = Log::new();
        let src = Source::new("test.glsl", text);
        let tokens = tokenize(&mut log, &src);
        (tokens.into_iter().map(|t| t.kind).collect(), log)
    }

    #[test]
    fn test_tokenisation() {
        use TokenKind::*;
        let test_cases = vec![
            (
                "uniform vec2 offset;",
                vec![
                    Uniform,
                    Ident("vec2".into()),
                    Ident("offset".into()),
                    Semicolon,
                    EndOfFile,
                ],
            ),
            (
                "x += 1.5e2; // trailing comment",
                vec![
                    Ident("x".into()),
                    PlusAssign,
                    FloatLiteral(150.0),
                    Semicolon,
                    EndOfFile,
                ],
            ),
            (
                "a.xy == .5 ? 1 : 0",
                vec![
                    Ident("a".into()),
                    Dot,
                    Ident("xy".into()),
                    Equal,
                    FloatLiteral(0.5),
                    Question,
                    IntLiteral(1),
                    Colon,
                    IntLiteral(0),
                    EndOfFile,
                ],
            ),
            (
                "/* skip */ i++ && !b",
                vec![
                    Ident("i".into()),
                    Increment,
                    AndAnd,
                    Not,
                    Ident("b".into()),
                    EndOfFile,
                ],
            ),
        ];

        for (src, expected) in test_cases {
            let (tokens, log) = kinds(src);
            assert!(!log.has_errors(), "unexpected errors for {:?}", src);
            assert_eq!(tokens, expected, "tokens for {:?}", src);
        }
    }

    #[test]
    fn test_directives() {
        use TokenKind::*;
        let (tokens, log) = kinds("#extension GL_OES_standard_derivatives : enable");
        assert!(!log.has_errors());
        assert_eq!(
            tokens,
            vec![
                Extension,
                Ident("GL_OES_standard_derivatives".into()),
                Colon,
                Ident("enable".into()),
                EndOfFile,
            ]
        );

        let (tokens, log) = kinds("#include \"lib.glsl\"");
        assert!(!log.has_errors());
        assert_eq!(
            tokens,
            vec![Include, StringLiteral("lib.glsl".into()), EndOfFile]
        );
    }

    #[test]
    fn test_error_recovery_continues_scanning() {
        let (tokens, log) = kinds("int $ x;");
        // one error for '$', but scanning keeps going
        assert_eq!(log.error_count(), 1);
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("int".into()),
                TokenKind::Ident("x".into()),
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_token_ranges_point_at_source() {
        let mut log = Log::new();
        let src = Source::new("test.glsl", "vec2 pos;");
        let tokens = tokenize(&mut log, &src);
        assert_eq!(tokens[1].range.text(), "pos");
        assert_eq!(tokens[1].range.location(), "test.glsl:1:6");
    }
}
