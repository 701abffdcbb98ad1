// Parser robustness tests
//
// Table-driven suites of sources that must parse, or must fail with a given
// message, plus a few checks on the shape of the produced tree.

use myth::ast::{ArithmeticOp, Stmt};
use myth::runner::parse;
use myth::value::Value;
use std::panic::{self, AssertUnwindSafe};

/// Outcome of one parser case
#[derive(Debug)]
enum Outcome {
    Pass,
    Fail(String),
    Crash(String),
}

/// What a case expects from the parser
#[derive(Debug, Clone)]
enum Expect {
    Parses,
    Fails,
    FailsWith(&'static str),
}

#[derive(Debug, Clone)]
struct Case {
    name: &'static str,
    source: String,
    expect: Expect,
}

impl Case {
    fn parses(name: &'static str, source: &str) -> Self {
        Self::new(name, source, Expect::Parses)
    }

    fn fails(name: &'static str, source: &str) -> Self {
        Self::new(name, source, Expect::Fails)
    }

    fn fails_with(name: &'static str, source: &str, message: &'static str) -> Self {
        Self::new(name, source, Expect::FailsWith(message))
    }

    fn new(name: &'static str, source: &str, expect: Expect) -> Self {
        Self {
            name,
            source: source.to_string(),
            expect,
        }
    }

    /// Parses the case, turning a parser panic into `Outcome::Crash`.
    fn run(&self) -> Outcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| parse(&self.source).map(|_| ())));

        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Outcome::Crash(message);
            }
        };

        match (result, &self.expect) {
            (Ok(()), Expect::Parses) => Outcome::Pass,
            (Ok(()), _) => Outcome::Fail("parsed, but a parse error was expected".to_string()),
            (Err(error), Expect::Parses) => {
                Outcome::Fail(format!("unexpected error: {}", error.message))
            }
            (Err(error), Expect::FailsWith(expected)) if !error.message.contains(expected) => {
                Outcome::Fail(format!(
                    "error '{}' does not mention '{}'",
                    error.message, expected
                ))
            }
            (Err(_), _) => Outcome::Pass,
        }
    }
}

struct Suite {
    name: &'static str,
    cases: Vec<Case>,
}

impl Suite {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            cases: Vec::new(),
        }
    }

    fn add(&mut self, case: Case) {
        self.cases.push(case);
    }

    /// Runs every case, printing one line each, and returns the names of the
    /// cases that did not pass.
    fn run(&self) -> Vec<String> {
        println!("suite: {}", self.name);

        let mut failures = Vec::new();
        for case in &self.cases {
            match case.run() {
                Outcome::Pass => println!("  ok    {}", case.name),
                Outcome::Fail(reason) => {
                    println!("  FAIL  {}: {}", case.name, reason);
                    failures.push(format!("{}::{}", self.name, case.name));
                }
                Outcome::Crash(reason) => {
                    println!("  CRASH {}: {}", case.name, reason);
                    failures.push(format!("{}::{}", self.name, case.name));
                }
            }
        }
        failures
    }
}

// ============================================================================
// Test Suite Creation Functions
// ============================================================================

fn create_malformed_expressions_tests() -> Suite {
    let mut suite = Suite::new("Malformed Expressions");

    suite.add(Case::fails_with(
        "unmatched_opening_paren",
        "x = (1 + 2\n",
        "Expected ')' after expression",
    ));
    suite.add(Case::fails_with(
        "unmatched_closing_paren",
        "x = 1 + 2)\n",
        "Expected end of line after statement",
    ));
    suite.add(Case::fails_with(
        "empty_parentheses",
        "x = ()\n",
        "Empty parentheses are not allowed",
    ));
    suite.add(Case::fails_with(
        "missing_right_operand",
        "x = 1 +\n",
        "Expected expression after '+'",
    ));
    suite.add(Case::fails_with(
        "missing_divisor",
        "x = 1 /\n",
        "Expected expression after '/'",
    ));
    suite.add(Case::fails_with(
        "two_values_on_a_line",
        "x = 1 2\n",
        "Expected end of line after statement",
    ));
    suite.add(Case::fails_with(
        "keyword_as_expression",
        "x = def\n",
        "Expected expression, found Def",
    ));
    suite.add(Case::fails_with(
        "unclosed_call",
        "x = y.f(1, 2\n",
        "Expected ')' after arguments",
    ));

    suite
}

fn create_assignment_tests() -> Suite {
    let mut suite = Suite::new("Assignment Tests");

    suite.add(Case::parses("simple", "x = 42\n"));
    suite.add(Case::parses("field", "x.y = 42\n"));
    suite.add(Case::parses("deep_field", "x.y.z = 'v'\n"));
    suite.add(Case::fails_with(
        "literal_target",
        "1 = 2\n",
        "Invalid assignment target",
    ));
    suite.add(Case::fails_with(
        "call_target",
        "x.f() = 2\n",
        "Invalid assignment target",
    ));
    suite.add(Case::fails_with(
        "field_of_call_result",
        "y = x.f().z\n",
        "Cannot access field 'z' of a call result",
    ));

    suite
}

fn create_class_tests() -> Suite {
    let mut suite = Suite::new("Class Tests");

    suite.add(Case::parses(
        "class_with_methods",
        "class A:\n  def __init__(x, y):\n    self.x = x\n  def get():\n    return self.x\n",
    ));
    suite.add(Case::parses(
        "inheritance",
        "class A:\n  def f():\n    return 1\nclass B(A):\n  def g():\n    return 2\nb = B()\n",
    ));
    suite.add(Case::fails_with(
        "unknown_base",
        "class B(A):\n  def f():\n    return 1\n",
        "Unknown base class 'A'",
    ));
    suite.add(Case::fails_with(
        "unknown_class_call",
        "x = Foo()\n",
        "Unknown class 'Foo'",
    ));
    suite.add(Case::fails_with(
        "statement_in_class_body",
        "class A:\n  x = 1\n",
        "Expected 'def' in class body",
    ));
    suite.add(Case::fails_with(
        "class_without_colon",
        "class A\n  def f():\n    return 1\n",
        "Expected ':' after class name",
    ));
    suite.add(Case::fails_with(
        "unindented_method_body",
        "class A:\n  def f():\n  return 1\n",
        "Expected an indented block",
    ));
    suite.add(Case::fails_with(
        "str_with_two_arguments",
        "x = str(1, 2)\n",
        "str() takes exactly 1 argument",
    ));

    suite
}

fn create_control_flow_tests() -> Suite {
    let mut suite = Suite::new("Control Flow Tests");

    suite.add(Case::parses("if_only", "if x:\n  print 1\n"));
    suite.add(Case::parses(
        "if_else",
        "if x > 1 and not y:\n  print 1\nelse:\n  print 2\n",
    ));
    suite.add(Case::parses(
        "nested_if",
        "if x:\n  if y:\n    print 1\n  else:\n    print 2\nprint 3\n",
    ));
    suite.add(Case::fails_with(
        "if_without_colon",
        "if x\n  print 1\n",
        "Expected ':' after if condition",
    ));
    suite.add(Case::fails_with(
        "if_without_body",
        "if x:\nprint 1\n",
        "Expected an indented block",
    ));
    suite.add(Case::fails_with(
        "stray_indentation",
        "x = 1\n  y = 2\n",
        "Unexpected indentation",
    ));
    suite.add(Case::fails("odd_indentation", "if x:\n   print 1\n"));

    suite
}

fn create_edge_case_tests() -> Suite {
    let mut suite = Suite::new("Edge Cases");

    suite.add(Case::parses("empty_input", ""));
    suite.add(Case::parses("only_blank_lines", "\n   \n\n"));
    suite.add(Case::parses("only_comments", "# one\n  # two\n"));
    suite.add(Case::parses("no_trailing_newline", "print 1"));
    suite.add(Case::fails("unterminated_string", "x = 'abc\n"));

    let deep_parens = format!("x = {}1{}\n", "(".repeat(40), ")".repeat(40));
    suite.add(Case::parses("deeply_nested_parens", &deep_parens));

    suite
}

fn create_positive_tests() -> Suite {
    let mut suite = Suite::new("Positive Tests");

    suite.add(Case::parses("simple_arithmetic", "x = 1 + 2 * 3\n"));
    suite.add(Case::parses("parentheses", "x = (1 + 2) * 3\n"));
    suite.add(Case::parses("unary_minus", "x = -1 - -2\n"));
    suite.add(Case::parses("string_concatenation", "x = 'hello' + \" world\"\n"));
    suite.add(Case::parses("boolean_operations", "x = True and not False or None\n"));
    suite.add(Case::parses("comparisons", "x = 1 < 2\ny = a.b >= c\nz = p != q\n"));
    suite.add(Case::parses("print_many", "print 1, 'a', x.y, str(z)\n"));
    suite.add(Case::parses("bare_print", "print\n"));
    suite.add(Case::parses("method_chain", "x.f(1).g(a, b).h()\n"));
    suite.add(Case::parses("top_level_return", "return 1\n"));

    suite
}

// ============================================================================
// Main Test Function
// ============================================================================

#[test]
fn comprehensive_parser_tests() {
    let suites = vec![
        create_malformed_expressions_tests(),
        create_assignment_tests(),
        create_class_tests(),
        create_control_flow_tests(),
        create_edge_case_tests(),
        create_positive_tests(),
    ];

    let failures: Vec<String> = suites.iter().flat_map(Suite::run).collect();

    assert!(failures.is_empty(), "failing cases: {:?}", failures);
}

// ============================================================================
// Tree shape
// ============================================================================

fn single_statement(source: &str) -> Stmt {
    let mut program = parse(source).unwrap();
    assert_eq!(program.statements.len(), 1);
    program.statements.remove(0)
}

#[test]
fn dotted_assignment_becomes_field_assignment() {
    match single_statement("a.b.c = 1\n") {
        Stmt::FieldAssignment { object, field, .. } => {
            assert_eq!(object, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(field, "c");
        }
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn chained_calls_nest_receivers() {
    match single_statement("x.f(1).g()\n") {
        Stmt::MethodCall { object, method, args, .. } => {
            assert_eq!(method, "g");
            assert!(args.is_empty());
            match *object {
                Stmt::MethodCall { method, args, .. } => {
                    assert_eq!(method, "f");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("unexpected receiver: {:?}", other),
            }
        }
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn unary_minus_lowers_to_subtraction_from_zero() {
    match single_statement("x = -y\n") {
        Stmt::Assignment { value, .. } => match *value {
            Stmt::Arithmetic {
                operator: ArithmeticOp::Sub,
                left,
                ..
            } => assert!(matches!(
                *left,
                Stmt::Constant {
                    value: Value::Number(0),
                    ..
                }
            )),
            other => panic!("unexpected value: {:?}", other),
        },
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn comparison_carries_its_operator() {
    match single_statement("x = a <= b\n") {
        Stmt::Assignment { value, .. } => match *value {
            Stmt::Comparison { comparator, .. } => assert_eq!(comparator.symbol(), "<="),
            other => panic!("unexpected value: {:?}", other),
        },
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn method_bodies_are_wrapped() {
    match single_statement("class A:\n  def f(a, b):\n    return a\n") {
        Stmt::ClassDefinition { class, .. } => {
            let method = class.method("f", 2).expect("f/2 is defined");
            assert_eq!(method.formal_params, vec!["a".to_string(), "b".to_string()]);
            assert!(matches!(method.body, Stmt::MethodBody { .. }));
            assert!(class.method("f", 1).is_none());
        }
        other => panic!("unexpected statement: {:?}", other),
    }
}

#[test]
fn parse_errors_carry_spans() {
    let source = "x = 1\ny = Foo()\n";
    let error = parse(source).unwrap_err();
    assert!(error.is_parse_error());
    assert_eq!(&source[error.span.start..error.span.end], "Foo");
}
