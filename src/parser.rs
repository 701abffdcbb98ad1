use crate::ast::{ArithmeticOp, LogicalOp, Program, Stmt};
use crate::error::{MythError, Span};
use crate::lexer::Lexer;
use crate::runtime::Comparator;
use crate::token::{Token, TokenKind};
use crate::value::{Class, Method, Value};
use std::collections::HashMap;
use std::rc::Rc;

pub struct Parser {
    lexer: Lexer,
    /// Classes whose definition has been fully parsed, by name.
    classes: HashMap<String, Rc<Class>>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn parse(&mut self) -> Result<Program, MythError> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, MythError> {
        if self.check(TokenKind::Class) {
            self.class_definition()
        } else if self.check(TokenKind::If) {
            self.if_statement()
        } else if self.check(TokenKind::Indent) {
            Err(MythError::parse_error_with_help(
                self.span(),
                "Unexpected indentation".to_string(),
                "Only the body of a class, method or if statement is indented.".to_string(),
            ))
        } else {
            let stmt = self.simple_statement()?;
            self.consume(Token::Newline, "Expected end of line after statement")?;
            Ok(stmt)
        }
    }

    fn class_definition(&mut self) -> Result<Stmt, MythError> {
        let start = self.span();
        self.advance();

        let (name, _) = self.consume_id("Expected class name after 'class'")?;

        let parent = if self.check_char('(') {
            self.advance();
            let (parent_name, parent_span) = self.consume_id("Expected base class name")?;
            let parent = self.classes.get(&parent_name).cloned().ok_or_else(|| {
                MythError::parse_error_with_help(
                    parent_span,
                    format!("Unknown base class '{}'", parent_name),
                    "A base class must be defined before classes inherit from it.".to_string(),
                )
            })?;
            self.consume(Token::Char(')'), "Expected ')' after base class name")?;
            Some(parent)
        } else {
            None
        };

        self.consume(Token::Char(':'), "Expected ':' after class name")?;
        self.consume(Token::Newline, "Expected end of line after ':'")?;
        self.consume_with_help(
            Token::Indent,
            "Expected an indented class body",
            "A class body is a list of 'def' methods indented by two spaces.".to_string(),
        )?;

        let mut methods = Vec::new();
        while self.check(TokenKind::Def) {
            methods.push(self.method_definition()?);
        }

        let end = self.consume_with_help(
            Token::Dedent,
            "Expected 'def' in class body",
            "Class bodies may only contain method definitions.".to_string(),
        )?;

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, Rc::clone(&class));

        Ok(Stmt::ClassDefinition {
            class,
            span: start.to(end),
        })
    }

    fn method_definition(&mut self) -> Result<Method, MythError> {
        let start = self.span();
        self.advance();

        let (name, _) = self.consume_id("Expected method name after 'def'")?;
        self.consume(Token::Char('('), "Expected '(' after method name")?;

        let mut formal_params = Vec::new();
        if !self.check_char(')') {
            loop {
                let (param, _) = self.consume_id("Expected parameter name")?;
                formal_params.push(param);
                if !self.check_char(',') {
                    break;
                }
                self.advance();
            }
        }

        self.consume(Token::Char(')'), "Expected ')' after parameters")?;
        self.consume(Token::Char(':'), "Expected ':' after method signature")?;

        let body = self.suite()?;
        let span = start.to(body.span());

        Ok(Method {
            name,
            formal_params,
            body: Stmt::MethodBody {
                body: Box::new(body),
                span,
            },
        })
    }

    fn suite(&mut self) -> Result<Stmt, MythError> {
        let start = self.consume(Token::Newline, "Expected end of line after ':'")?;
        self.consume_with_help(
            Token::Indent,
            "Expected an indented block",
            "Indent the block by two more spaces than the line that opens it.".to_string(),
        )?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }

        let end = self.consume(Token::Dedent, "Expected the end of the block")?;

        Ok(Stmt::Compound {
            statements,
            span: start.to(end),
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, MythError> {
        let start = self.span();
        self.advance();

        let condition = self.test()?;
        self.consume(Token::Char(':'), "Expected ':' after if condition")?;
        let if_body = self.suite()?;

        let else_body = if self.check(TokenKind::Else) {
            self.advance();
            self.consume(Token::Char(':'), "Expected ':' after 'else'")?;
            Some(Box::new(self.suite()?))
        } else {
            None
        };

        let end = else_body
            .as_ref()
            .map(|body| body.span())
            .unwrap_or_else(|| if_body.span());

        Ok(Stmt::IfElse {
            condition: Box::new(condition),
            if_body: Some(Box::new(if_body)),
            else_body,
            span: start.to(end),
        })
    }

    fn simple_statement(&mut self) -> Result<Stmt, MythError> {
        let start = self.span();

        if self.check(TokenKind::Return) {
            self.advance();
            let value = self.test()?;
            let span = start.to(value.span());
            return Ok(Stmt::Return {
                value: Box::new(value),
                span,
            });
        }

        if self.check(TokenKind::Print) {
            self.advance();
            let mut args = Vec::new();
            let mut end = start;
            if !self.check(TokenKind::Newline) {
                loop {
                    let arg = self.test()?;
                    end = arg.span();
                    args.push(arg);
                    if !self.check_char(',') {
                        break;
                    }
                    self.advance();
                }
            }
            return Ok(Stmt::Print {
                args,
                span: start.to(end),
            });
        }

        let expr = self.test()?;

        if !self.check_char('=') {
            return Ok(expr);
        }
        self.advance();

        let value = self.test()?;
        let span = start.to(value.span());

        match expr {
            Stmt::VariableValue { dotted_ids, .. } => match dotted_ids.split_last() {
                Some((name, [])) => Ok(Stmt::Assignment {
                    name: name.clone(),
                    value: Box::new(value),
                    span,
                }),
                Some((field, object)) => Ok(Stmt::FieldAssignment {
                    object: object.to_vec(),
                    field: field.clone(),
                    value: Box::new(value),
                    span,
                }),
                None => Err(MythError::parse_error(
                    span,
                    "Invalid assignment target".to_string(),
                )),
            },
            other => Err(MythError::parse_error_with_help(
                other.span(),
                "Invalid assignment target".to_string(),
                "Only variables and fields such as 'x' or 'self.x' can be assigned to."
                    .to_string(),
            )),
        }
    }

    fn test(&mut self) -> Result<Stmt, MythError> {
        self.or()
    }

    fn or(&mut self) -> Result<Stmt, MythError> {
        let mut expr = self.and()?;

        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.and()?;
            expr = logical(LogicalOp::Or, expr, right);
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Stmt, MythError> {
        let mut expr = self.not()?;

        while self.check(TokenKind::And) {
            self.advance();
            let right = self.not()?;
            expr = logical(LogicalOp::And, expr, right);
        }

        Ok(expr)
    }

    fn not(&mut self) -> Result<Stmt, MythError> {
        if self.check(TokenKind::Not) {
            let start = self.span();
            self.advance();
            let operand = self.not()?;
            let span = start.to(operand.span());
            return Ok(Stmt::Not {
                operand: Box::new(operand),
                span,
            });
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Stmt, MythError> {
        let left = self.term()?;

        let Some(comparator) = self.comparator() else {
            return Ok(left);
        };
        self.advance();

        let right = self.term()?;
        let span = left.span().to(right.span());

        Ok(Stmt::Comparison {
            comparator,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn comparator(&self) -> Option<Comparator> {
        match self.lexer.current_token() {
            Token::Eq => Some(Comparator::EQUAL),
            Token::NotEq => Some(Comparator::NOT_EQUAL),
            Token::LessOrEq => Some(Comparator::LESS_OR_EQUAL),
            Token::GreaterOrEq => Some(Comparator::GREATER_OR_EQUAL),
            Token::Char('<') => Some(Comparator::LESS),
            Token::Char('>') => Some(Comparator::GREATER),
            _ => None,
        }
    }

    fn term(&mut self) -> Result<Stmt, MythError> {
        let mut expr = self.factor()?;

        loop {
            let operator = if self.check_char('+') {
                ArithmeticOp::Add
            } else if self.check_char('-') {
                ArithmeticOp::Sub
            } else {
                break;
            };
            let operator_span = self.span();
            self.advance();

            let message = format!("Expected expression after '{}'", symbol(operator));
            let right = self.operand_after(operator_span, &message, Self::factor)?;
            expr = arithmetic(operator, expr, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Stmt, MythError> {
        let mut expr = self.unary()?;

        loop {
            let operator = if self.check_char('*') {
                ArithmeticOp::Mult
            } else if self.check_char('/') {
                ArithmeticOp::Div
            } else {
                break;
            };
            let operator_span = self.span();
            self.advance();

            let message = format!("Expected expression after '{}'", symbol(operator));
            let right = self.operand_after(operator_span, &message, Self::unary)?;
            expr = arithmetic(operator, expr, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Stmt, MythError> {
        if self.check_char('-') {
            let start = self.span();
            self.advance();
            let operand = self.unary()?;
            let zero = Stmt::Constant {
                value: Value::Number(0),
                span: start,
            };
            return Ok(arithmetic(ArithmeticOp::Sub, zero, operand));
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Stmt, MythError> {
        let span = self.span();
        let token = self.lexer.current_token().clone();

        let value = match token {
            Token::Number(n) => Value::Number(n),
            Token::String(s) => Value::String(s),
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::None => Value::None,
            Token::Char('(') => {
                self.advance();
                if self.check_char(')') {
                    return Err(MythError::parse_error_with_help(
                        span.to(self.span()),
                        "Empty parentheses are not allowed".to_string(),
                        "Parentheses must wrap an expression, e.g. (x + 1).".to_string(),
                    ));
                }
                let inner = self.test()?;
                self.consume(Token::Char(')'), "Expected ')' after expression")?;
                return Ok(inner);
            }
            Token::Id(name) => {
                self.advance();
                return self.name_expression(name, span);
            }
            Token::Eof => {
                return Err(MythError::parse_error_with_help(
                    span,
                    "Unexpected end of input".to_string(),
                    "Expected an expression here. Check for unmatched parentheses or incomplete statements.".to_string(),
                ));
            }
            other => {
                return Err(MythError::parse_error(
                    span,
                    format!("Expected expression, found {}", other),
                ));
            }
        };

        self.advance();
        Ok(Stmt::Constant { value, span })
    }

    /// Parses what follows an identifier: a `str(...)` conversion, a class
    /// instantiation, a dotted variable, or a chain of method calls.
    fn name_expression(&mut self, name: String, start: Span) -> Result<Stmt, MythError> {
        if self.check_char('(') {
            if name == "str" {
                let (mut args, end) = self.call_args()?;
                if args.len() != 1 {
                    return Err(MythError::parse_error(
                        start.to(end),
                        format!("str() takes exactly 1 argument, got {}", args.len()),
                    ));
                }
                let arg = args.remove(0);
                return Ok(Stmt::Stringify {
                    arg: Box::new(arg),
                    span: start.to(end),
                });
            }

            if let Some(class) = self.classes.get(&name).cloned() {
                let (args, end) = self.call_args()?;
                return Ok(Stmt::NewInstance {
                    class,
                    args,
                    span: start.to(end),
                });
            }

            return Err(MythError::parse_error_with_help(
                start,
                format!("Unknown class '{}'", name),
                "Only classes defined earlier in the program and str() can be called directly; methods are called through an object.".to_string(),
            ));
        }

        let mut dotted_ids = vec![name];
        let mut end = start;

        while self.check_char('.') {
            self.advance();
            let (field, field_span) = self.consume_id("Expected field or method name after '.'")?;

            if self.check_char('(') {
                let object = Stmt::VariableValue {
                    dotted_ids,
                    span: start.to(end),
                };
                return self.method_calls(object, field, start);
            }

            dotted_ids.push(field);
            end = field_span;
        }

        Ok(Stmt::VariableValue {
            dotted_ids,
            span: start.to(end),
        })
    }

    fn method_calls(&mut self, object: Stmt, method: String, start: Span) -> Result<Stmt, MythError> {
        let (args, end) = self.call_args()?;
        let mut expr = Stmt::MethodCall {
            object: Box::new(object),
            method,
            args,
            span: start.to(end),
        };

        while self.check_char('.') {
            self.advance();
            let (method, method_span) = self.consume_id("Expected method name after '.'")?;
            if !self.check_char('(') {
                return Err(MythError::parse_error_with_help(
                    method_span,
                    format!("Cannot access field '{}' of a call result", method),
                    "Assign the result to a variable first, then read its fields.".to_string(),
                ));
            }
            let (args, end) = self.call_args()?;
            expr = Stmt::MethodCall {
                object: Box::new(expr),
                method,
                args,
                span: start.to(end),
            };
        }

        Ok(expr)
    }

    fn call_args(&mut self) -> Result<(Vec<Stmt>, Span), MythError> {
        self.consume(Token::Char('('), "Expected '('")?;

        let mut args = Vec::new();
        if !self.check_char(')') {
            loop {
                args.push(self.test()?);
                if !self.check_char(',') {
                    break;
                }
                self.advance();
            }
        }

        let end = self.consume_with_help(
            Token::Char(')'),
            "Expected ')' after arguments",
            "Separate arguments with ',' and close the call with ')'.".to_string(),
        )?;
        Ok((args, end))
    }

    fn operand_after(
        &mut self,
        operator_span: Span,
        message: &str,
        operand: fn(&mut Self) -> Result<Stmt, MythError>,
    ) -> Result<Stmt, MythError> {
        if self.check(TokenKind::Newline) || self.check(TokenKind::Eof) {
            return Err(MythError::parse_error(operator_span, message.to_string()));
        }
        operand(self)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.lexer.current_token().is(kind)
    }

    fn check_char(&self, c: char) -> bool {
        self.lexer.current_token().is_char(c)
    }

    fn advance(&mut self) {
        self.lexer.next_token();
    }

    fn span(&self) -> Span {
        self.lexer.current_span()
    }

    fn consume(&mut self, expected: Token, message: &str) -> Result<Span, MythError> {
        let span = self.span();
        self.lexer.expect_value(&expected).map_err(|_| {
            MythError::parse_error(
                span,
                format!("{}, found {}", message, self.lexer.current_token()),
            )
        })?;
        self.advance();
        Ok(span)
    }

    fn consume_with_help(
        &mut self,
        expected: Token,
        message: &str,
        help: String,
    ) -> Result<Span, MythError> {
        self.consume(expected, message).map_err(|mut error| {
            error.help = Some(help);
            error
        })
    }

    fn consume_id(&mut self, message: &str) -> Result<(String, Span), MythError> {
        let span = self.span();
        let name = self
            .lexer
            .expect_id()
            .map_err(|_| {
                MythError::parse_error(
                    span,
                    format!("{}, found {}", message, self.lexer.current_token()),
                )
            })?
            .to_string();
        self.advance();
        Ok((name, span))
    }
}

fn logical(operator: LogicalOp, left: Stmt, right: Stmt) -> Stmt {
    let span = left.span().to(right.span());
    Stmt::Logical {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

fn arithmetic(operator: ArithmeticOp, left: Stmt, right: Stmt) -> Stmt {
    let span = left.span().to(right.span());
    Stmt::Arithmetic {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

fn symbol(operator: ArithmeticOp) -> char {
    match operator {
        ArithmeticOp::Add => '+',
        ArithmeticOp::Sub => '-',
        ArithmeticOp::Mult => '*',
        ArithmeticOp::Div => '/',
    }
}
