//! Abstract syntax tree consumed by the code generator.
//!
//! The node set is closed: the parser produces exactly these kinds, and the
//! generator matches on them exhaustively. Documents are exchanged as JSON with
//! an internal `kind` tag, e.g. `{"kind": "identifier", "name": "x"}`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Literal constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Numeric literal (all numbers are doubles)
    Number(f64),
    /// String literal
    String(String),
    /// The `null` literal
    Null,
}

/// AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Literal constant
    Literal {
        /// Constant value
        value: Literal,
    },

    /// Variable reference
    Identifier {
        /// Variable name
        name: String,
    },

    /// Binary operation: `left op right`
    Binary {
        /// Operator spelling (`+`, `<=`, `and`, ...)
        op: String,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
    },

    /// Unary operation: `op operand`
    Unary {
        /// Operator spelling (`not`, `-`)
        op: String,
        /// Operand
        operand: Box<Node>,
    },

    /// Binding: `name is value`
    Assignment {
        /// Target variable
        name: String,
        /// Assigned expression
        value: Box<Node>,
    },

    /// Element store: `target[index] is value`
    IndexedAssignment {
        /// List expression
        target: Box<Node>,
        /// Element index
        index: Box<Node>,
        /// Stored value
        value: Box<Node>,
    },

    /// Function definition: `define name as: ...`
    FunctionDef {
        /// Function name
        name: String,
        /// Parameter names
        #[serde(default)]
        params: Vec<String>,
        /// Function body
        body: Vec<Node>,
    },

    /// Return from the current function
    Return {
        /// Optional returned expression
        #[serde(default)]
        value: Option<Box<Node>>,
    },

    /// Exit the innermost loop
    Break,

    /// `if condition: ... else: ...`
    Conditional {
        /// Branch condition
        condition: Box<Node>,
        /// Statements run when the condition holds
        then_block: Vec<Node>,
        /// Statements run otherwise
        #[serde(default)]
        else_block: Vec<Node>,
    },

    /// `loop while condition: ...`
    Loop {
        /// Condition re-tested before every iteration
        condition: Box<Node>,
        /// Loop body
        body: Vec<Node>,
    },

    /// List literal: `[a, b, c]`
    ListLiteral {
        /// Element expressions
        elements: Vec<Node>,
    },

    /// Element read: `list[index]`
    Index {
        /// List or string expression
        list: Box<Node>,
        /// Element index
        index: Box<Node>,
    },

    /// Member access: `object.member` (module member or struct field)
    MemberAccess {
        /// Accessed object
        object: Box<Node>,
        /// Member name
        member: String,
    },

    /// Struct type declaration
    StructDef {
        /// Type name
        name: String,
        /// Field names in declaration order
        fields: Vec<String>,
    },

    /// Struct construction: `Name of [a, b]`
    StructLiteral {
        /// Type name
        name: String,
        /// Field values in declaration order
        args: Vec<Node>,
    },

    /// Interrogative: `what/why/how/when is target`
    Interrogative {
        /// Question word
        word: String,
        /// Queried expression
        target: Box<Node>,
    },

    /// Function application: `callee of argument`
    Relation {
        /// Called function
        callee: Box<Node>,
        /// Argument (a list literal supplies several arguments)
        argument: Box<Node>,
    },

    /// `import module`
    Import {
        /// Module name
        module: String,
    },
}

impl Node {
    /// Numeric literal
    pub fn num(value: f64) -> Self {
        Node::Literal {
            value: Literal::Number(value),
        }
    }

    /// String literal
    pub fn text(value: impl Into<String>) -> Self {
        Node::Literal {
            value: Literal::String(value.into()),
        }
    }

    /// Variable reference
    pub fn ident(name: impl Into<String>) -> Self {
        Node::Identifier { name: name.into() }
    }

    /// `name is value`
    pub fn assign(name: impl Into<String>, value: Node) -> Self {
        Node::Assignment {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// `left op right`
    pub fn binary(op: impl Into<String>, left: Node, right: Node) -> Self {
        Node::Binary {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `callee of argument` with a plain identifier callee
    pub fn call(callee: impl Into<String>, argument: Node) -> Self {
        Node::Relation {
            callee: Box::new(Node::ident(callee)),
            argument: Box::new(argument),
        }
    }

    /// List literal
    pub fn list(elements: Vec<Node>) -> Self {
        Node::ListLiteral { elements }
    }

    /// Node kind name, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Literal { .. } => "Literal",
            Node::Identifier { .. } => "Identifier",
            Node::Binary { .. } => "BinaryOp",
            Node::Unary { .. } => "UnaryOp",
            Node::Assignment { .. } => "Assignment",
            Node::IndexedAssignment { .. } => "IndexedAssignment",
            Node::FunctionDef { .. } => "FunctionDef",
            Node::Return { .. } => "Return",
            Node::Break => "Break",
            Node::Conditional { .. } => "Conditional",
            Node::Loop { .. } => "Loop",
            Node::ListLiteral { .. } => "ListLiteral",
            Node::Index { .. } => "Index",
            Node::MemberAccess { .. } => "MemberAccess",
            Node::StructDef { .. } => "StructDef",
            Node::StructLiteral { .. } => "StructLiteral",
            Node::Interrogative { .. } => "Interrogative",
            Node::Relation { .. } => "Relation",
            Node::Import { .. } => "Import",
        }
    }

    /// Collect every variable name this node reads, recursively.
    /// Assignment targets are not reads: inside a function they bind locals.
    pub fn collect_reads(&self, out: &mut BTreeSet<String>) {
        match self {
            Node::Literal { .. } | Node::Break | Node::Import { .. } | Node::StructDef { .. } => {}
            Node::Identifier { name } => {
                out.insert(name.clone());
            }
            Node::Binary { left, right, .. } => {
                left.collect_reads(out);
                right.collect_reads(out);
            }
            Node::Unary { operand, .. } => operand.collect_reads(out),
            Node::Assignment { value, .. } => value.collect_reads(out),
            Node::IndexedAssignment {
                target,
                index,
                value,
            } => {
                target.collect_reads(out);
                index.collect_reads(out);
                value.collect_reads(out);
            }
            Node::FunctionDef { body, .. } => {
                for stmt in body {
                    stmt.collect_reads(out);
                }
            }
            Node::Loop { condition, body } => {
                condition.collect_reads(out);
                for stmt in body {
                    stmt.collect_reads(out);
                }
            }
            Node::Return { value } => {
                if let Some(value) = value {
                    value.collect_reads(out);
                }
            }
            Node::Conditional {
                condition,
                then_block,
                else_block,
            } => {
                condition.collect_reads(out);
                for stmt in then_block.iter().chain(else_block) {
                    stmt.collect_reads(out);
                }
            }
            Node::ListLiteral { elements } => {
                for e in elements {
                    e.collect_reads(out);
                }
            }
            Node::Index { list, index } => {
                list.collect_reads(out);
                index.collect_reads(out);
            }
            Node::MemberAccess { object, .. } => object.collect_reads(out),
            Node::StructLiteral { args, .. } => {
                for a in args {
                    a.collect_reads(out);
                }
            }
            Node::Interrogative { target, .. } => target.collect_reads(out),
            Node::Relation { callee, argument } => {
                // Bare callee names are functions, not variables
                if !matches!(callee.as_ref(), Node::Identifier { .. }) {
                    callee.collect_reads(out);
                }
                argument.collect_reads(out);
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Literal { value } => match value {
                Literal::Number(n) => write!(f, "{}", n),
                Literal::String(s) => write!(f, "{:?}", s),
                Literal::Null => write!(f, "null"),
            },
            Node::Identifier { name } => write!(f, "{}", name),
            Node::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Node::Unary { op, operand } => write!(f, "({} {})", op, operand),
            Node::MemberAccess { object, member } => write!(f, "{}.{}", object, member),
            Node::Relation { callee, argument } => write!(f, "({} of {})", callee, argument),
            other => write!(f, "<{}>", other.kind_name()),
        }
    }
}

/// Import recorded by the module resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Module name (also the symbol prefix of its exports)
    pub module: String,
    /// Resolved source or object path, if the resolver found one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// One compilation unit as handed over by the front end
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Top-level statements
    pub statements: Vec<Node>,
    /// Names the observer analysis marked for full tracking
    #[serde(default)]
    pub observed: Vec<String>,
    /// Resolved imports, in source order
    #[serde(default)]
    pub imports: Vec<ImportSpec>,
    /// Module name when the unit is compiled as a library
    #[serde(default)]
    pub module: Option<String>,
}

impl SourceUnit {
    /// Wrap a statement list with no analysis results
    pub fn new(statements: Vec<Node>) -> Self {
        Self {
            statements,
            ..Default::default()
        }
    }

    /// Parse a unit from its JSON form
    pub fn from_json(text: &str) -> Result<Self> {
        let unit: SourceUnit = serde_json::from_str(text)?;
        Ok(unit)
    }

    /// Read and parse a unit from a JSON file
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&text)
    }

    /// Imported module names in first-seen order: resolver imports, then
    /// top-level `import` statements
    pub fn imported_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = Vec::new();
        let from_statements = self.statements.iter().filter_map(|stmt| match stmt {
            Node::Import { module } => Some(module),
            _ => None,
        });
        for module in self.imports.iter().map(|i| &i.module).chain(from_statements) {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }
        modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_nodes() {
        let json = r#"{
            "statements": [
                {"kind": "assignment", "name": "x", "value": {"kind": "literal", "value": 3}},
                {"kind": "relation",
                 "callee": {"kind": "identifier", "name": "print"},
                 "argument": {"kind": "literal", "value": "hi"}},
                {"kind": "break"}
            ],
            "observed": ["x"]
        }"#;
        let unit = SourceUnit::from_json(json).unwrap();
        assert_eq!(unit.statements.len(), 3);
        assert_eq!(unit.statements[0], Node::assign("x", Node::num(3.0)));
        assert_eq!(unit.statements[1], Node::call("print", Node::text("hi")));
        assert_eq!(unit.statements[2], Node::Break);
        assert_eq!(unit.observed, vec!["x".to_string()]);
    }

    #[test]
    fn test_unknown_node_kind_rejected() {
        let json = r#"{"statements": [{"kind": "lambda", "body": []}]}"#;
        let err = SourceUnit::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InputFormat(_)));
    }

    #[test]
    fn test_imported_modules_dedup_in_order() {
        let mut unit = SourceUnit::new(vec![
            Node::Import {
                module: "physics".into(),
            },
            Node::Import {
                module: "control".into(),
            },
        ]);
        unit.imports.push(ImportSpec {
            module: "control".into(),
            path: None,
        });
        assert_eq!(unit.imported_modules(), vec!["control", "physics"]);
    }

    #[test]
    fn test_collect_reads_skips_callees_and_targets() {
        let node = Node::assign("y", Node::call("f", Node::ident("x")));
        let mut names = BTreeSet::new();
        node.collect_reads(&mut names);
        assert!(names.contains("x"));
        assert!(!names.contains("y"));
        assert!(!names.contains("f"));
    }
}
