use crate::error::{MythError, Span};
use crate::evaluator::Evaluator;
use crate::value::Value;
use std::fmt;
use std::io::Write;

/// Services available to a running program.
pub trait Context {
    /// Sink for `print`. `None` turns printing into a no-op.
    fn output(&mut self) -> Option<&mut dyn Write>;
}

/// Context writing program output to any `Write` implementation.
#[derive(Debug, Default)]
pub struct SimpleContext<W: Write> {
    output: W,
}

impl<W: Write> SimpleContext<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl SimpleContext<Vec<u8>> {
    /// Everything printed so far, for contexts capturing into memory.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl<W: Write> Context for SimpleContext<W> {
    fn output(&mut self) -> Option<&mut dyn Write> {
        Some(&mut self.output)
    }
}

/// Context without an output sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullContext;

impl Context for NullContext {
    fn output(&mut self) -> Option<&mut dyn Write> {
        None
    }
}

type CompareFn = fn(&Value, &Value, &mut Evaluator<'_>) -> Result<bool, MythError>;

/// A relational operator, injected into `Stmt::Comparison` by the parser.
#[derive(Clone, Copy)]
pub struct Comparator {
    symbol: &'static str,
    compare: CompareFn,
}

impl Comparator {
    pub const EQUAL: Comparator = Comparator::new("==", equal);
    pub const NOT_EQUAL: Comparator = Comparator::new("!=", not_equal);
    pub const LESS: Comparator = Comparator::new("<", less);
    pub const GREATER: Comparator = Comparator::new(">", greater);
    pub const LESS_OR_EQUAL: Comparator = Comparator::new("<=", less_or_equal);
    pub const GREATER_OR_EQUAL: Comparator = Comparator::new(">=", greater_or_equal);

    pub const fn new(symbol: &'static str, compare: CompareFn) -> Self {
        Self { symbol, compare }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn apply(
        &self,
        left: &Value,
        right: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Result<bool, MythError> {
        (self.compare)(left, right, evaluator)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Comparator({})", self.symbol)
    }
}

pub fn equal(left: &Value, right: &Value, evaluator: &mut Evaluator<'_>) -> Result<bool, MythError> {
    match (left, right) {
        (Value::None, Value::None) => Ok(true),
        (Value::Number(l), Value::Number(r)) => Ok(l == r),
        (Value::String(l), Value::String(r)) => Ok(l == r),
        (Value::Bool(l), Value::Bool(r)) => Ok(l == r),
        (Value::Instance(instance), _) if instance.borrow().class().has_method("__eq__", 1) => {
            let result = evaluator.call_method(instance, "__eq__", vec![right.clone()])?;
            Ok(result.is_truthy())
        }
        _ => Err(MythError::runtime_error(
            Span::default(),
            format!(
                "Cannot compare {} and {} for equality",
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

pub fn less(left: &Value, right: &Value, evaluator: &mut Evaluator<'_>) -> Result<bool, MythError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(l < r),
        (Value::String(l), Value::String(r)) => Ok(l < r),
        (Value::Bool(l), Value::Bool(r)) => Ok(l < r),
        (Value::Instance(instance), _) if instance.borrow().class().has_method("__lt__", 1) => {
            let result = evaluator.call_method(instance, "__lt__", vec![right.clone()])?;
            Ok(result.is_truthy())
        }
        _ => Err(MythError::runtime_error(
            Span::default(),
            format!(
                "Cannot compare {} and {} for less",
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

pub fn not_equal(
    left: &Value,
    right: &Value,
    evaluator: &mut Evaluator<'_>,
) -> Result<bool, MythError> {
    Ok(!equal(left, right, evaluator)?)
}

pub fn greater(
    left: &Value,
    right: &Value,
    evaluator: &mut Evaluator<'_>,
) -> Result<bool, MythError> {
    Ok(!less(left, right, evaluator)? && !equal(left, right, evaluator)?)
}

pub fn less_or_equal(
    left: &Value,
    right: &Value,
    evaluator: &mut Evaluator<'_>,
) -> Result<bool, MythError> {
    Ok(!greater(left, right, evaluator)?)
}

pub fn greater_or_equal(
    left: &Value,
    right: &Value,
    evaluator: &mut Evaluator<'_>,
) -> Result<bool, MythError> {
    Ok(!less(left, right, evaluator)?)
}
