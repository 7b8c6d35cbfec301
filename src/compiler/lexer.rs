//! Tokenizer for the behavior definition language.

use crate::error::{BehaviorError, Result};

/// A lexical token together with its 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords.
    Behavior,
    Place,
    Transition,
    Accepting,
    In,
    Process,
    Thread,
    Where,
    And,
    Or,
    True,
    False,

    /// Bare identifier.
    Ident(String),
    /// Quoted identifier or string literal, unescaped.
    Quoted(String),
    /// Integer literal (decimal, `0x` prefixed, or trailing-`h` hex).
    Number(u64),

    Arrow,
    DotDot,
    Dot,
    Comma,
    Underscore,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    EqEq,
    NotEq,
    Le,
    Ge,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
}

impl TokenKind {
    /// Short rendering used in "expected X" diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Behavior => "`behavior`".to_string(),
            TokenKind::Place => "`place`".to_string(),
            TokenKind::Transition => "`transition`".to_string(),
            TokenKind::Accepting => "`accepting`".to_string(),
            TokenKind::In => "`in`".to_string(),
            TokenKind::Process => "`process`".to_string(),
            TokenKind::Thread => "`thread`".to_string(),
            TokenKind::Where => "`where`".to_string(),
            TokenKind::And => "`and`".to_string(),
            TokenKind::Or => "`or`".to_string(),
            TokenKind::True => "`true`".to_string(),
            TokenKind::False => "`false`".to_string(),
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Quoted(text) => format!("`\"{text}\"`"),
            TokenKind::Number(n) => format!("`{n}`"),
            TokenKind::Arrow => "`->`".to_string(),
            TokenKind::DotDot => "`..`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Underscore => "`_`".to_string(),
            TokenKind::LeftBrace => "`{`".to_string(),
            TokenKind::RightBrace => "`}`".to_string(),
            TokenKind::LeftBracket => "`[`".to_string(),
            TokenKind::RightBracket => "`]`".to_string(),
            TokenKind::LeftParen => "`(`".to_string(),
            TokenKind::RightParen => "`)`".to_string(),
            TokenKind::EqEq => "`==`".to_string(),
            TokenKind::NotEq => "`!=`".to_string(),
            TokenKind::Le => "`<=`".to_string(),
            TokenKind::Ge => "`>=`".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::Percent => "`%`".to_string(),
            TokenKind::Amp => "`&`".to_string(),
            TokenKind::Pipe => "`|`".to_string(),
            TokenKind::Caret => "`^`".to_string(),
            TokenKind::Tilde => "`~`".to_string(),
        }
    }
}

/// Splits a behavior definition into tokens. `//` comments run to the end of
/// the line.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let (line, column) = (self.line, self.column);

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            if c == '/' && self.peek_second() == Some('/') {
                while self.chars.peek().is_some_and(|&c| c != '\n') {
                    self.bump();
                }
                continue;
            }

            let kind = if c == '"' {
                TokenKind::Quoted(self.lex_string()?)
            } else if c.is_ascii_digit() {
                self.lex_number()?
            } else if c.is_alphabetic() || c == '_' {
                self.lex_word()
            } else {
                self.lex_operator()?
            };

            tokens.push(Token { kind, line, column });
        }

        Ok(tokens)
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

    fn peek_second(&self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> BehaviorError {
        BehaviorError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn lex_string(&mut self) -> Result<String> {
        self.bump();
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("unterminated string literal"));
            };
            match c {
                '"' => return Ok(text),
                '\n' => return Err(self.error("unterminated string literal")),
                '\\' => {
                    let Some(escape) = self.bump() else {
                        return Err(self.error("unterminated string literal"));
                    };
                    text.push(match escape {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        other => {
                            return Err(self.error(format!("unrecognized escape sequence `\\{other}`")))
                        }
                    });
                }
                other => text.push(other),
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind> {
        let mut text = String::new();
        while self
            .chars
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        {
            text.push(self.bump().unwrap_or_default());
        }

        let number = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16)
        } else if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
            u64::from_str_radix(hex, 16)
        } else {
            text.parse()
        };

        match number {
            Ok(value) => Ok(TokenKind::Number(value)),
            Err(_) => Err(self.error(format!("invalid number literal `{text}`"))),
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while self
            .chars
            .peek()
            .is_some_and(|&c| c.is_alphanumeric() || c == '_')
        {
            word.push(self.bump().unwrap_or_default());
        }

        match word.as_str() {
            "behavior" => TokenKind::Behavior,
            "place" => TokenKind::Place,
            "transition" => TokenKind::Transition,
            "accepting" => TokenKind::Accepting,
            "in" => TokenKind::In,
            "process" => TokenKind::Process,
            "thread" => TokenKind::Thread,
            "where" => TokenKind::Where,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "_" => TokenKind::Underscore,
            _ => TokenKind::Ident(word),
        }
    }

    fn lex_operator(&mut self) -> Result<TokenKind> {
        let Some(c) = self.bump() else {
            return Err(self.error("unexpected end of input"));
        };
        let kind = match c {
            '-' if self.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '.' if self.eat('.') => TokenKind::DotDot,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '=' if self.eat('=') => TokenKind::EqEq,
            '!' if self.eat('=') => TokenKind::NotEq,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            other => return Err(self.error(format!("unexpected character `{other}`"))),
        };
        Ok(kind)
    }
}
