use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Valued tokens
    Number(i32),
    Id(String),
    Char(char),
    String(String),

    // Keywords
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Two character operators
    Eq,
    NotEq,
    LessOrEq,
    GreaterOrEq,

    // Structure
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// Payload-less discriminant of [`Token`], used for kind-only expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    Id,
    Char,
    String,
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,
    Eq,
    NotEq,
    LessOrEq,
    GreaterOrEq,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Number(_) => TokenKind::Number,
            Token::Id(_) => TokenKind::Id,
            Token::Char(_) => TokenKind::Char,
            Token::String(_) => TokenKind::String,
            Token::Class => TokenKind::Class,
            Token::Return => TokenKind::Return,
            Token::If => TokenKind::If,
            Token::Else => TokenKind::Else,
            Token::Def => TokenKind::Def,
            Token::Print => TokenKind::Print,
            Token::And => TokenKind::And,
            Token::Or => TokenKind::Or,
            Token::Not => TokenKind::Not,
            Token::None => TokenKind::None,
            Token::True => TokenKind::True,
            Token::False => TokenKind::False,
            Token::Eq => TokenKind::Eq,
            Token::NotEq => TokenKind::NotEq,
            Token::LessOrEq => TokenKind::LessOrEq,
            Token::GreaterOrEq => TokenKind::GreaterOrEq,
            Token::Newline => TokenKind::Newline,
            Token::Indent => TokenKind::Indent,
            Token::Dedent => TokenKind::Dedent,
            Token::Eof => TokenKind::Eof,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn is_char(&self, c: char) -> bool {
        matches!(self, Token::Char(found) if *found == c)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::Number => "Number",
            TokenKind::Id => "Id",
            TokenKind::Char => "Char",
            TokenKind::String => "String",
            TokenKind::Class => "Class",
            TokenKind::Return => "Return",
            TokenKind::If => "If",
            TokenKind::Else => "Else",
            TokenKind::Def => "Def",
            TokenKind::Print => "Print",
            TokenKind::And => "And",
            TokenKind::Or => "Or",
            TokenKind::Not => "Not",
            TokenKind::None => "None",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::Eq => "Eq",
            TokenKind::NotEq => "NotEq",
            TokenKind::LessOrEq => "LessOrEq",
            TokenKind::GreaterOrEq => "GreaterOrEq",
            TokenKind::Newline => "Newline",
            TokenKind::Indent => "Indent",
            TokenKind::Dedent => "Dedent",
            TokenKind::Eof => "Eof",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "Number{{{}}}", n),
            Token::Id(name) => write!(f, "Id{{{}}}", name),
            Token::Char(c) => write!(f, "Char{{{}}}", c),
            Token::String(s) => write!(f, "String{{{}}}", s),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Keywords and the two-character operators, shared by every lexer.
pub fn keywords() -> &'static HashMap<&'static str, Token> {
    static KEYWORDS: OnceLock<HashMap<&'static str, Token>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        let mut keywords = HashMap::new();
        keywords.insert("class", Token::Class);
        keywords.insert("return", Token::Return);
        keywords.insert("if", Token::If);
        keywords.insert("else", Token::Else);
        keywords.insert("def", Token::Def);
        keywords.insert("print", Token::Print);
        keywords.insert("and", Token::And);
        keywords.insert("or", Token::Or);
        keywords.insert("not", Token::Not);
        keywords.insert("None", Token::None);
        keywords.insert("True", Token::True);
        keywords.insert("False", Token::False);
        keywords.insert("==", Token::Eq);
        keywords.insert("!=", Token::NotEq);
        keywords.insert("<=", Token::LessOrEq);
        keywords.insert(">=", Token::GreaterOrEq);
        keywords
    })
}
