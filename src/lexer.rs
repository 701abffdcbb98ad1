use crate::error::{MythError, Span};
use crate::token::{keywords, Token, TokenKind};
use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::{debug, warn};

/// A token together with the source bytes it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
}

type LineChars<'a> = Peekable<CharIndices<'a>>;

/// Indentation-aware scanner.
///
/// The whole source is scanned up front into a queue; the parser then walks it
/// with one token of lookahead. The queue always ends with `Eof`, which is
/// never popped, so `current_token` is always valid.
pub struct Lexer {
    tokens: VecDeque<Lexeme>,
    indent: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Result<Self, MythError> {
        let mut lexer = Self {
            tokens: VecDeque::new(),
            indent: 0,
        };
        lexer.scan_source(source)?;
        debug!(tokens = lexer.tokens.len(), "lexed source");
        Ok(lexer)
    }

    /// Scans `source` and returns every token up to and including `Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, MythError> {
        let lexer = Self::new(source)?;
        Ok(lexer.tokens.into_iter().map(|lexeme| lexeme.token).collect())
    }

    pub fn current_token(&self) -> &Token {
        &self.tokens[0].token
    }

    pub fn current_span(&self) -> Span {
        self.tokens[0].span
    }

    /// Advances to the next token. Once `Eof` is reached it stays current.
    pub fn next_token(&mut self) -> &Token {
        if self.tokens.len() > 1 {
            self.tokens.pop_front();
        }
        self.current_token()
    }

    pub fn expect(&self, kind: TokenKind) -> Result<&Token, MythError> {
        let token = self.current_token();
        if token.is(kind) {
            Ok(token)
        } else {
            Err(self.expectation_error(&kind.to_string()))
        }
    }

    /// Checks kind and payload of the current token.
    pub fn expect_value(&self, expected: &Token) -> Result<(), MythError> {
        self.expect(expected.kind())?;
        if self.current_token() == expected {
            Ok(())
        } else {
            Err(self.expectation_error(&expected.to_string()))
        }
    }

    pub fn expect_next(&mut self, kind: TokenKind) -> Result<&Token, MythError> {
        self.next_token();
        self.expect(kind)
    }

    pub fn expect_next_value(&mut self, expected: &Token) -> Result<(), MythError> {
        self.next_token();
        self.expect_value(expected)
    }

    pub fn expect_id(&self) -> Result<&str, MythError> {
        match self.current_token() {
            Token::Id(name) => Ok(name.as_str()),
            _ => Err(self.expectation_error("Id")),
        }
    }

    pub fn expect_next_id(&mut self) -> Result<&str, MythError> {
        self.next_token();
        self.expect_id()
    }

    fn expectation_error(&self, expected: &str) -> MythError {
        MythError::lex_error(
            self.current_span(),
            format!(
                "Lexer expects token {}, found {}",
                expected,
                self.current_token()
            ),
        )
    }

    fn scan_source(&mut self, source: &str) -> Result<(), MythError> {
        let mut offset = 0;
        for line in source.split('\n') {
            let line_start = offset;
            offset += line.len() + 1;

            if is_blank(line) {
                continue;
            }

            let spaces = line.len() - line.trim_start_matches(' ').len();
            if spaces % 2 != 0 {
                return Err(MythError::lex_error_with_help(
                    Span::new(line_start, line_start + spaces),
                    format!("Invalid indentation: {} leading spaces", spaces),
                    "Each indentation level is exactly two spaces.".to_string(),
                ));
            }
            self.indent_to(spaces / 2, Span::new(line_start, line_start + spaces));

            self.scan_line(&line[spaces..], line_start + spaces)?;

            let line_end = line_start + line.len();
            self.push(Token::Newline, Span::single(line_end));
        }

        let end = source.len();
        self.indent_to(0, Span::single(end));
        self.push(Token::Eof, Span::single(end));
        Ok(())
    }

    fn indent_to(&mut self, depth: usize, span: Span) {
        while self.indent < depth {
            self.indent += 1;
            self.push(Token::Indent, span);
        }
        while self.indent > depth {
            self.indent -= 1;
            self.push(Token::Dedent, span);
        }
    }

    fn scan_line(&mut self, text: &str, base: usize) -> Result<(), MythError> {
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            let start = base + i;
            match c {
                '#' => break,
                c if c.is_whitespace() => {}
                '=' | '<' | '>' | '!' => {
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        let operator = format!("{}=", c);
                        if let Some(token) = keywords().get(operator.as_str()) {
                            self.push(token.clone(), Span::new(start, start + 2));
                        }
                    } else {
                        self.push(Token::Char(c), Span::single(start));
                    }
                }
                c if is_delimiter(c) => self.push(Token::Char(c), Span::single(start)),
                c if c.is_ascii_digit() => self.number(text, i, &mut chars, base)?,
                c if c.is_ascii_alphabetic() || c == '_' => {
                    self.identifier(text, i, &mut chars, base)
                }
                '"' | '\'' => self.string(text, c, i, &mut chars, base)?,
                other => {
                    warn!(character = %other, offset = start, "skipping unrecognised character");
                }
            }
        }

        Ok(())
    }

    fn number(
        &mut self,
        text: &str,
        start: usize,
        chars: &mut LineChars<'_>,
        base: usize,
    ) -> Result<(), MythError> {
        let mut end = start + 1;
        while let Some(&(j, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            end = j + 1;
            chars.next();
        }

        let digits = &text[start..end];
        let span = Span::new(base + start, base + end);
        let value = digits.parse::<i32>().map_err(|_| {
            MythError::lex_error_with_help(
                span,
                format!("Invalid integer: {}", digits),
                format!(
                    "Integer literals must fit in {}..={}.",
                    i32::MIN,
                    i32::MAX
                ),
            )
        })?;

        self.push(Token::Number(value), span);
        Ok(())
    }

    fn identifier(&mut self, text: &str, start: usize, chars: &mut LineChars<'_>, base: usize) {
        let mut end = start + 1;
        while let Some(&(j, c)) = chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            end = j + 1;
            chars.next();
        }

        let word = &text[start..end];
        let token = keywords()
            .get(word)
            .cloned()
            .unwrap_or_else(|| Token::Id(word.to_string()));

        self.push(token, Span::new(base + start, base + end));
    }

    fn string(
        &mut self,
        text: &str,
        quote: char,
        start: usize,
        chars: &mut LineChars<'_>,
        base: usize,
    ) -> Result<(), MythError> {
        let unterminated = || {
            MythError::lex_error_with_help(
                Span::new(base + start, base + text.len()),
                "Unterminated string".to_string(),
                format!("Close the string with {} on the same line.", quote),
            )
        };

        let mut value = String::new();
        let end = loop {
            match chars.next() {
                None => return Err(unterminated()),
                Some((j, c)) if c == quote => break j + 1,
                Some((j, '\\')) => match chars.next() {
                    Some((_, '"')) => value.push('"'),
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, '\'')) => value.push('\''),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((k, other)) => {
                        return Err(MythError::lex_error_with_help(
                            Span::new(base + j, base + k + other.len_utf8()),
                            format!("Unsupported escape sequence: \\{}", other),
                            "Supported escapes are \\\" \\' \\n \\r \\t and \\\\.".to_string(),
                        ));
                    }
                    None => return Err(unterminated()),
                },
                Some((_, c)) => value.push(c),
            }
        };

        self.push(Token::String(value), Span::new(base + start, base + end));
        Ok(())
    }

    fn push(&mut self, token: Token, span: Span) {
        self.tokens.push_back(Lexeme { token, span });
    }
}

fn is_blank(line: &str) -> bool {
    let content = line.trim_start();
    content.is_empty() || content.starts_with('#')
}

fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        ':' | '(' | ')' | '.' | ',' | '@' | '%' | '$' | '^' | '&' | ';' | '{' | '}' | '[' | ']'
            | '?' | '+' | '-' | '*' | '/'
    )
}
