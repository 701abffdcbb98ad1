use crate::ast::{ArithmeticOp, LogicalOp, Program, Stmt};
use crate::error::{MythError, Span};
use crate::runtime::Context;
use crate::value::{Closure, Instance, InstanceRef, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Ordinary completion.
    Value(Value),
    /// A `return` unwinding to the nearest method body.
    Return(Value),
}

impl Flow {
    pub fn none() -> Self {
        Flow::Value(Value::None)
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Flow::Return(_))
    }

    pub fn value(&self) -> &Value {
        match self {
            Flow::Value(value) | Flow::Return(value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Flow::Value(value) | Flow::Return(value) => value,
        }
    }
}

/// How a block decides to stop early and hand a child's result upward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnPropagation {
    /// A block stops at a direct `return`, or at a direct `if`/method call
    /// statement that produced a return or any non-None value. Anything
    /// nested under another kind of statement is dropped.
    #[default]
    DirectChildren,
    /// A block stops at the first `Flow::Return` from any child, however
    /// deeply it was raised. Ordinary values never stop a block.
    Structured,
}

pub struct Evaluator<'ctx> {
    context: &'ctx mut dyn Context,
    return_propagation: ReturnPropagation,
}

impl<'ctx> Evaluator<'ctx> {
    pub fn new(context: &'ctx mut dyn Context) -> Self {
        Self {
            context,
            return_propagation: ReturnPropagation::default(),
        }
    }

    pub fn with_return_propagation(mut self, return_propagation: ReturnPropagation) -> Self {
        self.return_propagation = return_propagation;
        self
    }

    pub fn return_propagation(&self) -> ReturnPropagation {
        self.return_propagation
    }

    /// Runs top-level statements. A top-level `return` ends the program
    /// normally with its value.
    pub fn evaluate_program(
        &mut self,
        program: &Program,
        closure: &mut Closure,
    ) -> Result<Value, MythError> {
        let flow = self.execute_block(&program.statements, closure)?;
        Ok(flow.into_value())
    }

    /// Evaluates an expression node, discarding any control-flow tag.
    pub fn evaluate(&mut self, stmt: &Stmt, closure: &mut Closure) -> Result<Value, MythError> {
        Ok(self.execute(stmt, closure)?.into_value())
    }

    pub fn execute(&mut self, stmt: &Stmt, closure: &mut Closure) -> Result<Flow, MythError> {
        match stmt {
            Stmt::Constant { value, .. } => Ok(Flow::Value(value.clone())),
            Stmt::Assignment { name, value, .. } => {
                let value = self.evaluate(value, closure)?;
                closure.assign(name, value.clone());
                Ok(Flow::Value(value))
            }
            Stmt::VariableValue { dotted_ids, span } => {
                Ok(Flow::Value(self.resolve(dotted_ids, closure, *span)?))
            }
            Stmt::Print { args, span } => {
                self.print(args, closure, *span)?;
                Ok(Flow::none())
            }
            Stmt::MethodCall {
                object,
                method,
                args,
                span,
            } => {
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(self.evaluate(arg, closure)?);
                }
                let receiver = self.evaluate(object, closure)?;

                match &receiver {
                    Value::Instance(instance)
                        if instance.borrow().class().has_method(method, actual_args.len()) =>
                    {
                        let result = self
                            .call_method(instance, method, actual_args)
                            .map_err(|e| e.or_span(*span))?;
                        Ok(Flow::Value(result))
                    }
                    _ => Err(MythError::runtime_error_with_help(
                        *span,
                        format!("Bad method call: {}", method),
                        format!(
                            "No method '{}' taking {} argument(s) on {}.",
                            method,
                            actual_args.len(),
                            receiver.type_name()
                        ),
                    )),
                }
            }
            Stmt::Stringify { arg, .. } => {
                let value = self.evaluate(arg, closure)?;
                Ok(Flow::Value(Value::String(self.render(&value)?)))
            }
            Stmt::Arithmetic {
                operator,
                left,
                right,
                span,
            } => {
                let left = self.evaluate(left, closure)?;
                let right = self.evaluate(right, closure)?;
                Ok(Flow::Value(self.arithmetic(*operator, left, right, *span)?))
            }
            Stmt::Compound { statements, .. } => self.execute_block(statements, closure),
            Stmt::Return { value, .. } => Ok(Flow::Return(self.evaluate(value, closure)?)),
            Stmt::ClassDefinition { class, .. } => {
                closure.assign(class.name(), Value::Class(Rc::clone(class)));
                Ok(Flow::none())
            }
            Stmt::FieldAssignment {
                object,
                field,
                value,
                span,
            } => {
                let instance = match self.resolve(object, closure, *span)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(MythError::runtime_error(
                            *span,
                            format!(
                                "Cannot assign field '{}' on {}",
                                field,
                                other.type_name()
                            ),
                        ))
                    }
                };
                let value = self.evaluate(value, closure)?;
                instance.borrow_mut().set_field(field, value.clone());
                Ok(Flow::Value(value))
            }
            Stmt::IfElse {
                condition,
                if_body,
                else_body,
                ..
            } => {
                let condition = self.evaluate(condition, closure)?;
                let branch = if condition.is_truthy() {
                    if_body
                } else {
                    else_body
                };
                match branch {
                    Some(body) => self.execute(body, closure),
                    None => Ok(Flow::none()),
                }
            }
            Stmt::Logical {
                operator,
                left,
                right,
                ..
            } => {
                // Both sides always run; there is no short-circuiting.
                let left = self.evaluate(left, closure)?.is_truthy();
                let right = self.evaluate(right, closure)?.is_truthy();
                let result = match operator {
                    LogicalOp::And => left && right,
                    LogicalOp::Or => left || right,
                };
                Ok(Flow::Value(Value::Bool(result)))
            }
            Stmt::Not { operand, .. } => {
                let operand = self.evaluate(operand, closure)?;
                Ok(Flow::Value(Value::Bool(!operand.is_truthy())))
            }
            Stmt::Comparison {
                comparator,
                left,
                right,
                span,
            } => {
                let left = self.evaluate(left, closure)?;
                let right = self.evaluate(right, closure)?;
                let result = comparator
                    .apply(&left, &right, self)
                    .map_err(|e| e.or_span(*span))?;
                Ok(Flow::Value(Value::Bool(result)))
            }
            Stmt::NewInstance { class, args, span } => {
                let instance: InstanceRef =
                    Rc::new(RefCell::new(Instance::new(Rc::clone(class))));
                trace!(class = class.name(), "new instance");

                if class.has_method("__init__", args.len()) {
                    let mut actual_args = Vec::with_capacity(args.len());
                    for arg in args {
                        actual_args.push(self.evaluate(arg, closure)?);
                    }
                    self.call_method(&instance, "__init__", actual_args)
                        .map_err(|e| e.or_span(*span))?;
                }

                Ok(Flow::Value(Value::Instance(instance)))
            }
            Stmt::MethodBody { body, .. } => {
                let flow = self.execute(body, closure)?;
                Ok(Flow::Value(flow.into_value()))
            }
        }
    }

    /// Invokes `method` on `instance` with a fresh closure holding `self` and
    /// the parameters.
    #[tracing::instrument(level = "debug", skip(self, instance, args), fields(arity = args.len()))]
    pub fn call_method(
        &mut self,
        instance: &InstanceRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, MythError> {
        let class = Rc::clone(instance.borrow().class());
        let Some(definition) = class.method(method, args.len()) else {
            return Err(MythError::runtime_error(
                Span::default(),
                format!(
                    "Bad method call: {} has no method '{}' taking {} argument(s)",
                    class.name(),
                    method,
                    args.len()
                ),
            ));
        };

        let mut closure = Closure::new();
        closure.assign("self", Value::Instance(Rc::clone(instance)));
        for (param, arg) in definition.formal_params.iter().zip(args) {
            closure.assign(param, arg);
        }

        let result = self.execute(&definition.body, &mut closure)?.into_value();
        debug!(class = class.name(), result = ?result, "method returned");
        Ok(result)
    }

    /// Printed form of a value, dispatching to `__str__` for instances that
    /// define it.
    pub fn render(&mut self, value: &Value) -> Result<String, MythError> {
        if let Value::Instance(instance) = value {
            if instance.borrow().class().has_method("__str__", 0) {
                let printed = self.call_method(instance, "__str__", Vec::new())?;
                return self.render(&printed);
            }
        }
        Ok(value.to_string())
    }

    fn execute_block(
        &mut self,
        statements: &[Stmt],
        closure: &mut Closure,
    ) -> Result<Flow, MythError> {
        for statement in statements {
            let flow = self.execute(statement, closure)?;
            if self.stops_block(statement, &flow) {
                return Ok(flow);
            }
        }
        Ok(Flow::none())
    }

    fn stops_block(&self, statement: &Stmt, flow: &Flow) -> bool {
        match self.return_propagation {
            ReturnPropagation::DirectChildren => match statement {
                Stmt::Return { .. } => true,
                Stmt::IfElse { .. } | Stmt::MethodCall { .. } => {
                    flow.is_return() || !flow.value().is_none()
                }
                _ => false,
            },
            ReturnPropagation::Structured => flow.is_return(),
        }
    }

    fn resolve(
        &self,
        dotted_ids: &[String],
        closure: &Closure,
        span: Span,
    ) -> Result<Value, MythError> {
        let Some((first, fields)) = dotted_ids.split_first() else {
            return Err(MythError::runtime_error(span, "Empty variable name".to_string()));
        };

        let mut value = closure.get(first).ok_or_else(|| {
            MythError::runtime_error(span, format!("Unknown variable '{}'", first))
        })?;

        for field in fields {
            let next = match &value {
                Value::Instance(instance) => {
                    let instance = instance.borrow();
                    let found = instance.field(field).ok_or_else(|| {
                        MythError::runtime_error(
                            span,
                            format!(
                                "Instance of {} has no field '{}'",
                                instance.class().name(),
                                field
                            ),
                        )
                    })?;
                    found
                }
                other => {
                    return Err(MythError::runtime_error(
                        span,
                        format!(
                            "Cannot read field '{}' of {}",
                            field,
                            other.type_name()
                        ),
                    ))
                }
            };
            value = next;
        }

        Ok(value)
    }

    fn print(&mut self, args: &[Stmt], closure: &mut Closure, span: Span) -> Result<(), MythError> {
        // Without a sink nothing is evaluated.
        if self.context.output().is_none() {
            return Ok(());
        }

        for (i, arg) in args.iter().enumerate() {
            let value = self.evaluate(arg, closure)?;
            let text = self.render(&value)?;
            if i > 0 {
                self.write_output(" ", span)?;
            }
            self.write_output(&text, span)?;
        }
        self.write_output("\n", span)
    }

    fn write_output(&mut self, text: &str, span: Span) -> Result<(), MythError> {
        if let Some(output) = self.context.output() {
            output.write_all(text.as_bytes()).map_err(|error| {
                MythError::runtime_error(span, format!("Failed to write output: {}", error))
            })?;
        }
        Ok(())
    }

    fn arithmetic(
        &mut self,
        operator: ArithmeticOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> Result<Value, MythError> {
        if operator == ArithmeticOp::Div && matches!(right, Value::Number(0)) {
            return Err(MythError::runtime_error(span, "Zero division".to_string()));
        }

        match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => {
                let result = match operator {
                    ArithmeticOp::Add => l.checked_add(*r),
                    ArithmeticOp::Sub => l.checked_sub(*r),
                    ArithmeticOp::Mult => l.checked_mul(*r),
                    ArithmeticOp::Div => l.checked_div(*r),
                };
                result.map(Value::Number).ok_or_else(|| {
                    MythError::runtime_error(
                        span,
                        format!("Integer overflow in {} of {} and {}", operator, l, r),
                    )
                })
            }
            (Value::String(l), Value::String(r)) if operator == ArithmeticOp::Add => {
                Ok(Value::String(format!("{}{}", l, r)))
            }
            (Value::Instance(instance), _)
                if instance.borrow().class().has_method(operator.method_name(), 1) =>
            {
                self.call_method(instance, operator.method_name(), vec![right.clone()])
                    .map_err(|e| e.or_span(span))
            }
            (l, r) => Err(MythError::runtime_error_with_help(
                span,
                format!("Bad {}: {} and {}", operator, l.type_name(), r.type_name()),
                format!(
                    "Define {} on the left operand's class to support this operation.",
                    operator.method_name()
                ),
            )),
        }
    }
}
