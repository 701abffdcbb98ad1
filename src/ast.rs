use crate::error::Span;
use crate::runtime::Comparator;
use crate::value::{Class, Value};
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Constant {
        value: Value,
        span: Span,
    },
    Assignment {
        name: String,
        value: Box<Stmt>,
        span: Span,
    },
    /// `a` or `a.b.c`: the first name comes from the closure, the rest are
    /// fields of the instance found so far.
    VariableValue {
        dotted_ids: Vec<String>,
        span: Span,
    },
    Print {
        args: Vec<Stmt>,
        span: Span,
    },
    MethodCall {
        object: Box<Stmt>,
        method: String,
        args: Vec<Stmt>,
        span: Span,
    },
    Stringify {
        arg: Box<Stmt>,
        span: Span,
    },
    Arithmetic {
        operator: ArithmeticOp,
        left: Box<Stmt>,
        right: Box<Stmt>,
        span: Span,
    },
    Compound {
        statements: Vec<Stmt>,
        span: Span,
    },
    Return {
        value: Box<Stmt>,
        span: Span,
    },
    ClassDefinition {
        class: Rc<Class>,
        span: Span,
    },
    FieldAssignment {
        object: Vec<String>,
        field: String,
        value: Box<Stmt>,
        span: Span,
    },
    IfElse {
        condition: Box<Stmt>,
        if_body: Option<Box<Stmt>>,
        else_body: Option<Box<Stmt>>,
        span: Span,
    },
    Logical {
        operator: LogicalOp,
        left: Box<Stmt>,
        right: Box<Stmt>,
        span: Span,
    },
    Not {
        operand: Box<Stmt>,
        span: Span,
    },
    Comparison {
        comparator: Comparator,
        left: Box<Stmt>,
        right: Box<Stmt>,
        span: Span,
    },
    NewInstance {
        class: Rc<Class>,
        args: Vec<Stmt>,
        span: Span,
    },
    MethodBody {
        body: Box<Stmt>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Constant { span, .. } => *span,
            Stmt::Assignment { span, .. } => *span,
            Stmt::VariableValue { span, .. } => *span,
            Stmt::Print { span, .. } => *span,
            Stmt::MethodCall { span, .. } => *span,
            Stmt::Stringify { span, .. } => *span,
            Stmt::Arithmetic { span, .. } => *span,
            Stmt::Compound { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::ClassDefinition { span, .. } => *span,
            Stmt::FieldAssignment { span, .. } => *span,
            Stmt::IfElse { span, .. } => *span,
            Stmt::Logical { span, .. } => *span,
            Stmt::Not { span, .. } => *span,
            Stmt::Comparison { span, .. } => *span,
            Stmt::NewInstance { span, .. } => *span,
            Stmt::MethodBody { span, .. } => *span,
        }
    }

    pub fn constant(value: Value) -> Self {
        Stmt::Constant {
            value,
            span: Span::default(),
        }
    }

    pub fn variable(name: &str) -> Self {
        Stmt::VariableValue {
            dotted_ids: vec![name.to_string()],
            span: Span::default(),
        }
    }

    pub fn compound(statements: Vec<Stmt>) -> Self {
        Stmt::Compound {
            statements,
            span: Span::default(),
        }
    }

    pub fn method_body(statements: Vec<Stmt>) -> Self {
        Stmt::MethodBody {
            body: Box::new(Stmt::compound(statements)),
            span: Span::default(),
        }
    }

    pub fn return_value(value: Stmt) -> Self {
        Stmt::Return {
            value: Box::new(value),
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mult,
    Div,
}

impl ArithmeticOp {
    /// The method an instance on the left-hand side may define to overload
    /// this operator.
    pub fn method_name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "__add__",
            ArithmeticOp::Sub => "__sub__",
            ArithmeticOp::Mult => "__mul__",
            ArithmeticOp::Div => "__div__",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ArithmeticOp::Add => "addition",
            ArithmeticOp::Sub => "subtraction",
            ArithmeticOp::Mult => "multiplication",
            ArithmeticOp::Div => "division",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
