use crate::ast::Stmt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type InstanceRef = Rc<RefCell<Instance>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Number(i32),
    String(String),
    Class(Rc<Class>),
    /// Instances are shared: every clone aliases the same field map.
    Instance(InstanceRef),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::None | Value::Class(_) | Value::Instance(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn new_instance(class: Rc<Class>) -> Self {
        Value::Instance(Rc::new(RefCell::new(Instance::new(class))))
    }
}

/// Primitives compare by value, classes and instances by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::Class(l), Value::Class(r)) => Rc::ptr_eq(l, r),
            (Value::Instance(l), Value::Instance(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Class(class) => write!(f, "Class({})", class.name()),
            Value::Instance(instance) => match instance.try_borrow() {
                Ok(instance) => write!(f, "Instance({})", instance.class().name()),
                Err(_) => write!(f, "Instance(<borrowed>)"),
            },
        }
    }
}

/// Printed form of a value, without user `__str__` dispatch.
///
/// The evaluator renders instances itself so that `__str__` can run; this is
/// the fallback it uses when that method is absent.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Class(class) => write!(f, "Class {}", class.name()),
            Value::Instance(instance) => {
                let name = instance
                    .try_borrow()
                    .map(|i| i.class().name().to_string())
                    .unwrap_or_default();
                write!(f, "<{} object at {:p}>", name, Rc::as_ptr(instance))
            }
        }
    }
}

#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    /// A `Stmt::MethodBody`.
    pub body: Stmt,
}

impl Method {
    pub fn arity(&self) -> usize {
        self.formal_params.len()
    }
}

pub struct Class {
    name: String,
    methods: Vec<Method>,
    parent: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        Self {
            name,
            methods,
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// Finds `name` with exactly `arity` parameters, searching parents when
    /// this class does not define it.
    pub fn method(&self, name: &str, arity: usize) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.arity() == arity)
            .or_else(|| self.parent.as_ref().and_then(|p| p.method(name, arity)))
    }

    pub fn has_method(&self, name: &str, arity: usize) -> bool {
        self.method(name, arity).is_some()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field(
                "methods",
                &self
                    .methods
                    .iter()
                    .map(|m| format!("{}/{}", m.name, m.arity()))
                    .collect::<Vec<_>>(),
            )
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

pub struct Instance {
    class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }
}

/// One scope's bindings. There is no enclosing chain: a method call starts a
/// fresh closure holding only `self` and its parameters.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    values: HashMap<String, Value>,
}

impl Closure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Creates or overwrites the binding.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
