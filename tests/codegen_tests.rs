//! End-to-end code generation tests
//! Demonstrates: SourceUnit → IrGenerator → Verifier → LLVM text

use eigenc::compiler::ir::{IrFunction, IrInstruction, IrType, Linkage, Value};
use eigenc::compiler::{ir_stats, runtime, Verifier};
use eigenc::{CompileOptions, CompileResult, Compiler, Error, ErrorKind, Node, SourceUnit};

const TARGET: &str = "x86_64-unknown-linux-gnu";

fn options(observed: &[&str]) -> CompileOptions {
    let mut options = CompileOptions::default();
    options.target = Some(TARGET.to_string());
    options.observed = observed.iter().map(|s| s.to_string()).collect();
    options
}

fn compile(statements: Vec<Node>, observed: &[&str]) -> CompileResult {
    Compiler::new(options(observed))
        .compile(&SourceUnit::new(statements))
        .unwrap()
}

fn compile_err(statements: Vec<Node>) -> Error {
    Compiler::new(options(&[]))
        .compile(&SourceUnit::new(statements))
        .unwrap_err()
}

fn function(name: &str, params: &[&str], body: Vec<Node>) -> Node {
    Node::FunctionDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
    }
}

fn ret(value: Node) -> Node {
    Node::Return {
        value: Some(Box::new(value)),
    }
}

fn when(condition: Node, then_block: Vec<Node>) -> Node {
    Node::Conditional {
        condition: Box::new(condition),
        then_block,
        else_block: vec![],
    }
}

fn loop_while(condition: Node, body: Vec<Node>) -> Node {
    Node::Loop {
        condition: Box::new(condition),
        body,
    }
}

fn ask(word: &str, target: Node) -> Node {
    Node::Interrogative {
        word: word.to_string(),
        target: Box::new(target),
    }
}

fn call_args<'a>(func: &'a IrFunction, callee: &str) -> Vec<&'a [Value]> {
    func.instructions()
        .filter_map(|instr| match instr {
            IrInstruction::Call { callee: c, args, .. } if c == callee => Some(args.as_slice()),
            _ => None,
        })
        .collect()
}

fn returns(func: &IrFunction) -> usize {
    func.instructions()
        .filter(|i| matches!(i, IrInstruction::Ret { .. }))
        .count()
}

// =============================================================================
// PLACEMENT SCENARIOS
// =============================================================================

#[test]
fn test_unobserved_loop_counter_never_allocates() {
    // i is 0
    // loop while i < 10000: i is i + 1
    let result = compile(
        vec![
            Node::assign("i", Node::num(0.0)),
            loop_while(
                Node::binary("<", Node::ident("i"), Node::num(10000.0)),
                vec![Node::assign(
                    "i",
                    Node::binary("+", Node::ident("i"), Node::num(1.0)),
                )],
            ),
        ],
        &[],
    );

    let stats = ir_stats(&result.module);
    assert_eq!(stats.allocations, 0);
    assert!(stats.calls.is_empty(), "unexpected calls: {:?}", stats.calls);
    assert_eq!(result.cleanup_count, 0);
    assert!(result.ir_text.contains("fcmp olt double"));
}

#[test]
fn test_observed_local_is_stack_initialized() {
    // define f as n: y is n + 1; return y
    // r is f of 2
    let result = compile(
        vec![
            function(
                "f",
                &["n"],
                vec![
                    Node::assign("y", Node::binary("+", Node::ident("n"), Node::num(1.0))),
                    ret(Node::ident("y")),
                ],
            ),
            Node::assign("r", Node::call("f", Node::num(2.0))),
        ],
        &["y"],
    );

    let f = result.module.function("f").unwrap();
    assert_eq!(f.count_calls(runtime::EIGEN_INIT), 1);
    assert_eq!(f.count_calls(runtime::EIGEN_CREATE), 0);
    assert_eq!(f.count_calls(runtime::EIGEN_DESTROY), 0);
    assert!(f
        .instructions()
        .any(|i| matches!(i, IrInstruction::Alloca { ty: IrType::Named(name), .. } if name == "EigenValue")));

    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::EIGEN_DESTROY), 0);
    assert_eq!(result.cleanup_count, 0);
}

#[test]
fn test_missing_argument_is_zero_padded() {
    // define add as a, b: return a + b
    // s is add of 5
    let result = compile(
        vec![
            function(
                "add",
                &["a", "b"],
                vec![ret(Node::binary("+", Node::ident("a"), Node::ident("b")))],
            ),
            Node::assign("s", Node::call("add", Node::num(5.0))),
        ],
        &[],
    );

    let main = result.module.function("main").unwrap();
    let calls = call_args(main, "add");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][1], Value::int(IrType::I64, 0));
    assert!(result.warnings.iter().any(|w| w.contains("zero-filled")));
}

#[test]
fn test_list_argument_spreads_over_parameters() {
    let result = compile(
        vec![
            function(
                "add",
                &["a", "b"],
                vec![ret(Node::binary("+", Node::ident("a"), Node::ident("b")))],
            ),
            Node::assign(
                "s",
                Node::call("add", Node::list(vec![Node::num(1.0), Node::num(2.0)])),
            ),
        ],
        &[],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(call_args(main, "add")[0].len(), 2);
    assert_eq!(main.count_calls(runtime::LIST_CREATE), 0);
    assert!(!result
        .warnings
        .iter()
        .any(|w| w.contains("zero-filled") || w.contains("dropped")));
}

#[test]
fn test_initializers_run_in_import_order() {
    let mut options = options(&[]);
    options.imported_modules = vec!["a".to_string(), "b".to_string()];
    let unit = SourceUnit::new(vec![Node::call("print", Node::num(1.0))]);
    let result = Compiler::new(options).compile(&unit).unwrap();

    let main = result.module.function("main").unwrap();
    assert_eq!(
        main.call_sequence(),
        vec!["a_init", "b_init", runtime::PRINT_DOUBLE]
    );
}

#[test]
fn test_import_statements_declare_initializers() {
    let unit = SourceUnit::new(vec![
        Node::Import {
            module: "physics".into(),
        },
        Node::call(
            "print",
            Node::MemberAccess {
                object: Box::new(Node::ident("physics")),
                member: "gravity".into(),
            },
        ),
    ]);
    let result = Compiler::new(options(&[])).compile(&unit).unwrap();

    let main = result.module.function("main").unwrap();
    assert_eq!(main.call_sequence()[0], "physics_init");
    assert!(result.module.declaration("physics_init").is_some());
    let gravity = result.module.global("physics_gravity").unwrap();
    assert!(gravity.is_external_decl());
    assert!(result
        .ir_text
        .contains("@physics_gravity = external global i64"));
}

// =============================================================================
// CLEANUP
// =============================================================================

#[test]
fn test_cleanup_runs_on_every_exit_path() {
    // x is 1 (observed)
    // if x > 0: return
    // print of x
    let result = compile(
        vec![
            Node::assign("x", Node::num(1.0)),
            when(
                Node::binary(">", Node::ident("x"), Node::num(0.0)),
                vec![Node::Return { value: None }],
            ),
            Node::call("print", Node::ident("x")),
        ],
        &["x"],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(result.cleanup_count, 1);
    assert_eq!(returns(main), 1);
    assert_eq!(main.count_calls(runtime::EIGEN_DESTROY), 1);
    let exit = main.block("exit").unwrap();
    assert!(exit
        .instructions
        .iter()
        .any(|i| i.callee() == Some(runtime::EIGEN_DESTROY)));
    assert!(result.ir_text.contains("br label %exit"));
}

#[test]
fn test_every_top_level_allocation_destroyed_once() {
    // s is "hello"
    // print of s + " world"
    // xs is [1, 2, 3]
    let result = compile(
        vec![
            Node::assign("s", Node::text("hello")),
            Node::call(
                "print",
                Node::binary("+", Node::ident("s"), Node::text(" world")),
            ),
            Node::assign(
                "xs",
                Node::list(vec![Node::num(1.0), Node::num(2.0), Node::num(3.0)]),
            ),
        ],
        &[],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(result.cleanup_count, 4);
    assert_eq!(main.count_calls(runtime::STRING_DESTROY), 3);
    assert_eq!(main.count_calls(runtime::LIST_DESTROY), 1);
    assert_eq!(main.count_calls(runtime::PRINT_STRING), 1);

    // Each cleanup slot is read exactly once, in the exit block
    for n in 0..result.cleanup_count {
        let slot = Value::global(format!("__cleanup.{}", n));
        let reads = main
            .instructions()
            .filter(|i| matches!(i, IrInstruction::Load { ptr, .. } if *ptr == slot))
            .count();
        assert_eq!(reads, 1, "slot {} read {} times", slot, reads);
    }
}

#[test]
fn test_observed_binding_in_loop_created_once() {
    let result = compile(
        vec![
            Node::assign("i", Node::num(0.0)),
            loop_while(
                Node::binary("<", Node::ident("i"), Node::num(3.0)),
                vec![
                    Node::assign("x", Node::ident("i")),
                    Node::assign("i", Node::binary("+", Node::ident("i"), Node::num(1.0))),
                ],
            ),
        ],
        &["x"],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::EIGEN_CREATE), 1);
    assert_eq!(main.count_calls(runtime::EIGEN_UPDATE), 1);
    assert!(main.blocks.iter().any(|b| b.label.starts_with("box_create_")));
    assert_eq!(result.cleanup_count, 1);
}

#[test]
fn test_struct_instances_are_not_freed() {
    let result = compile(
        vec![
            Node::StructDef {
                name: "Point".into(),
                fields: vec!["x".into(), "y".into()],
            },
            Node::assign(
                "p",
                Node::StructLiteral {
                    name: "Point".into(),
                    args: vec![Node::num(1.0), Node::num(2.0)],
                },
            ),
            Node::call(
                "print",
                Node::MemberAccess {
                    object: Box::new(Node::ident("p")),
                    member: "y".into(),
                },
            ),
        ],
        &[],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::MALLOC), 1);
    assert_eq!(result.cleanup_count, 0);
    assert!(result.ir_text.contains("call ptr @malloc(i64 16)"));
    assert_eq!(main.count_calls(runtime::PRINT_DOUBLE), 1);
}

// =============================================================================
// LIBRARIES AND LINKAGE
// =============================================================================

#[test]
fn test_library_symbols_and_exports() {
    let mut options = CompileOptions::library("physics");
    options.target = Some(TARGET.to_string());
    options.observed.insert("gravity".to_string());
    let unit = SourceUnit::new(vec![
        Node::assign("gravity", Node::num(9.8)),
        Node::assign("_scratch", Node::num(1.0)),
        function(
            "step",
            &["x"],
            vec![ret(Node::binary("*", Node::ident("x"), Node::ident("gravity")))],
        ),
    ]);
    let result = Compiler::new(options).compile(&unit).unwrap();

    let names: Vec<&str> = result
        .module
        .functions
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["physics_init", "physics_step"]);
    assert!(result.module.function("main").is_none());
    assert_eq!(result.module.function("physics_init").unwrap().ret, IrType::Void);
    assert!(result.ir_text.contains("define void @physics_init()"));

    let export = result.module.global("physics_gravity").unwrap();
    assert_eq!(export.linkage, Linkage::External);
    assert_eq!(export.ty, IrType::I64);
    assert_eq!(
        result.module.global("physics.gravity").unwrap().linkage,
        Linkage::Private
    );
    assert_eq!(
        result.module.global("_physics.scratch").unwrap().linkage,
        Linkage::Private
    );
    assert!(result.module.global("physics__scratch").is_none());

    // Library initializers leave allocations to the program
    assert_eq!(result.cleanup_count, 0);
    let init = result.module.function("physics_init").unwrap();
    assert_eq!(init.count_calls(runtime::EIGEN_CREATE), 1);
    assert_eq!(init.count_calls(runtime::EIGEN_DESTROY), 0);
}

#[test]
fn test_unit_module_field_selects_library_mode() {
    let mut unit = SourceUnit::new(vec![Node::assign("rate", Node::num(0.5))]);
    unit.module = Some("control".into());
    let result = Compiler::new(options(&[])).compile(&unit).unwrap();
    assert!(result.module.function("control_init").is_some());
    assert!(result.module.global("control_rate").is_some());
}

#[test]
fn test_function_reads_are_deferred_to_linker() {
    let result = compile(
        vec![function("g", &[], vec![ret(Node::ident("shared_counter"))])],
        &[],
    );
    let global = result.module.global("shared_counter").unwrap();
    assert!(global.is_external_decl());
    assert_eq!(global.ty, IrType::I64);
}

#[test]
fn test_library_exports_are_words_importers_can_decode() {
    let mut lib_options = CompileOptions::library("physics");
    lib_options.target = Some(TARGET.to_string());
    lib_options.observed.insert("gravity".to_string());
    let library = Compiler::new(lib_options)
        .compile(&SourceUnit::new(vec![
            Node::assign("gravity", Node::num(9.8)),
            Node::assign("items", Node::list(vec![Node::num(1.0), Node::num(2.0)])),
            Node::assign("gravity", Node::num(9.81)),
        ]))
        .unwrap();
    for name in ["physics_gravity", "physics_items"] {
        let export = library.module.global(name).unwrap();
        assert_eq!(export.ty, IrType::I64, "{}", name);
        assert_eq!(export.linkage, Linkage::External, "{}", name);
    }
    // every top-level assignment refreshes the exported word
    let init = library.module.function("physics_init").unwrap();
    let refreshes = init
        .instructions()
        .filter(|i| {
            matches!(i, IrInstruction::Store { ptr, .. } if *ptr == Value::global("physics_gravity"))
        })
        .count();
    assert_eq!(refreshes, 2);

    let member = |name: &str| Node::MemberAccess {
        object: Box::new(Node::ident("physics")),
        member: name.into(),
    };
    let program = Compiler::new(options(&[]))
        .compile(&SourceUnit::new(vec![
            Node::Import {
                module: "physics".into(),
            },
            Node::call("print", member("gravity")),
            Node::call("print", Node::call("length", member("items"))),
        ]))
        .unwrap();
    let items = program.module.global("physics_items").unwrap();
    assert!(items.is_external_decl());
    assert_eq!(items.ty, IrType::I64);
    let main = program.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::LIST_LENGTH), 1);
    assert_eq!(main.count_calls(runtime::PRINT_DOUBLE), 2);
    assert!(program.verification.unwrap().valid);
}

#[test]
fn test_function_assignment_shadows_top_level_name() {
    // x is 1
    // define f as: x is 5; return x
    let result = compile(
        vec![
            Node::assign("x", Node::num(1.0)),
            function(
                "f",
                &[],
                vec![Node::assign("x", Node::num(5.0)), ret(Node::ident("x"))],
            ),
            function("g", &[], vec![Node::assign("y", Node::num(2.0)), ret(Node::ident("y"))]),
            Node::call("print", Node::call("f", Node::num(0.0))),
            Node::call("print", Node::ident("x")),
        ],
        &["x", "y"],
    );

    let f = result.module.function("f").unwrap();
    assert_eq!(f.count_calls(runtime::EIGEN_INIT), 1);
    assert_eq!(f.count_calls(runtime::EIGEN_UPDATE), 0);
    let top_level_x = Value::global("main.x");
    assert!(!f.instructions().any(|i| i.operands().contains(&&top_level_x)));

    // a name bound only inside a function stays local
    assert!(result.module.global("main.y").is_none());
    assert!(result.verification.unwrap().valid);
}

#[test]
fn test_top_level_names_used_by_functions_become_globals() {
    let result = compile(
        vec![
            Node::assign("rate", Node::num(2.0)),
            function(
                "scale",
                &["v"],
                vec![ret(Node::binary("*", Node::ident("v"), Node::ident("rate")))],
            ),
            Node::call("print", Node::call("scale", Node::num(3.0))),
        ],
        &[],
    );
    let rate = result.module.global("main.rate").unwrap();
    assert_eq!(rate.linkage, Linkage::Internal);
    assert!(result.ir_text.contains("@main.rate = internal global double"));
}

#[test]
fn test_user_function_named_like_runtime_is_renamed() {
    let result = compile(
        vec![
            function("sqrt", &["x"], vec![ret(Node::ident("x"))]),
            Node::call("print", Node::call("sqrt", Node::num(4.0))),
        ],
        &[],
    );
    assert!(result.module.function("sqrt.user").is_some());
    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls("sqrt.user"), 1);
    assert_eq!(main.count_calls("sqrt"), 0);
}

// =============================================================================
// VALUE KINDS AND BUILTINS
// =============================================================================

#[test]
fn test_lists_index_store_and_length() {
    let xs = || Node::ident("xs");
    let result = compile(
        vec![
            Node::assign(
                "xs",
                Node::list(vec![Node::num(1.0), Node::num(2.0), Node::num(3.0)]),
            ),
            Node::IndexedAssignment {
                target: Box::new(xs()),
                index: Box::new(Node::num(0.0)),
                value: Box::new(Node::num(5.0)),
            },
            Node::call(
                "print",
                Node::Index {
                    list: Box::new(xs()),
                    index: Box::new(Node::num(1.0)),
                },
            ),
            Node::call("print", Node::call("length", xs())),
            Node::call("append", Node::list(vec![xs(), Node::num(4.0)])),
        ],
        &[],
    );

    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::LIST_CREATE), 1);
    assert_eq!(main.count_calls(runtime::LIST_SET), 4);
    assert_eq!(main.count_calls(runtime::LIST_GET), 1);
    assert_eq!(main.count_calls(runtime::LIST_LENGTH), 1);
    assert_eq!(main.count_calls(runtime::LIST_APPEND), 1);
}

#[test]
fn test_predicates_follow_last_binding() {
    let statements = || {
        vec![
            Node::assign("x", Node::num(1.0)),
            Node::assign("x", Node::num(2.0)),
            when(
                Node::ident("converged"),
                vec![Node::call("print", Node::ident("x"))],
            ),
        ]
    };

    let tracked = compile(statements(), &["x"]);
    let main = tracked.module.function("main").unwrap();
    assert_eq!(main.count_calls("eigen_check_converged"), 1);
    assert_eq!(main.count_calls(runtime::EIGEN_UPDATE), 1);
    assert_eq!(main.count_calls(runtime::PRINT_VAL), 1);

    let fast = compile(statements(), &[]);
    let main = fast.module.function("main").unwrap();
    assert_eq!(main.count_calls("eigen_check_converged"), 0);
    assert_eq!(main.count_calls(runtime::PRINT_DOUBLE), 1);
}

#[test]
fn test_interrogatives() {
    let statements = || {
        vec![
            Node::assign("x", Node::num(1.0)),
            Node::assign("g", ask("why", Node::ident("x"))),
            Node::assign("t", ask("when", Node::ident("x"))),
            Node::assign("v", ask("what", Node::ident("x"))),
        ]
    };

    let tracked = compile(statements(), &["x"]);
    let main = tracked.module.function("main").unwrap();
    assert_eq!(main.count_calls(runtime::EIGEN_GET_GRADIENT), 1);
    assert_eq!(main.count_calls(runtime::EIGEN_GET_ITERATION), 1);
    assert!(tracked.ir_text.contains("sitofp i64"));

    let fast = compile(statements(), &[]);
    let stats = ir_stats(&fast.module);
    assert!(stats.calls.is_empty(), "unexpected calls: {:?}", stats.calls);
}

#[test]
fn test_math_builtins() {
    let result = compile(
        vec![
            Node::call("print", Node::call("abs", Node::num(-2.0))),
            Node::call(
                "print",
                Node::call("pow", Node::list(vec![Node::num(2.0), Node::num(8.0)])),
            ),
        ],
        &[],
    );
    let main = result.module.function("main").unwrap();
    assert_eq!(main.count_calls("fabs"), 1);
    assert_eq!(main.count_calls("pow"), 1);
}

#[test]
fn test_break_leaves_loop() {
    let i = || Node::ident("i");
    let result = compile(
        vec![
            Node::assign("i", Node::num(0.0)),
            loop_while(
                Node::binary("<", i(), Node::num(10.0)),
                vec![
                    when(Node::binary(">", i(), Node::num(5.0)), vec![Node::Break]),
                    Node::assign("i", Node::binary("+", i(), Node::num(1.0))),
                ],
            ),
        ],
        &[],
    );
    assert!(result.ir_text.contains("br label %loop_end_2"));
    assert!(result.verification.unwrap().valid);
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

#[test]
fn test_undefined_name_suggests_near_miss() {
    let err = compile_err(vec![
        Node::assign("total", Node::num(1.0)),
        Node::call("print", Node::ident("totl")),
    ]);
    assert!(matches!(err, Error::UndefinedName { ref name, .. } if name == "totl"));
    assert_eq!(err.hint(), Some("Did you mean: total?"));
    assert_eq!(err.classify(), ErrorKind::Diagnostic);
    assert!(err.enhanced_message().contains("hint: Did you mean: total?"));
}

#[test]
fn test_struct_diagnostics() {
    let point = Node::StructDef {
        name: "Point".into(),
        fields: vec!["x".into(), "y".into()],
    };
    let err = compile_err(vec![
        point.clone(),
        Node::StructLiteral {
            name: "Point".into(),
            args: vec![Node::num(1.0)],
        },
    ]);
    assert!(matches!(
        err,
        Error::StructArity {
            expected: 2,
            got: 1,
            ..
        }
    ));

    let err = compile_err(vec![
        point,
        Node::StructLiteral {
            name: "Vec3".into(),
            args: vec![],
        },
    ]);
    assert!(matches!(err, Error::UnknownStruct { ref name, .. } if name == "Vec3"));
    assert_eq!(err.hint(), Some("Known struct types: Point"));
}

#[test]
fn test_invalid_operators() {
    let err = compile_err(vec![Node::binary("^", Node::num(1.0), Node::num(2.0))]);
    assert!(matches!(err, Error::InvalidOperator { ref operator, .. } if operator == "^"));
    assert!(err.hint().unwrap().contains("supported operators"));

    let err = compile_err(vec![ask("who", Node::num(1.0))]);
    assert!(matches!(err, Error::InvalidOperator { ref operator, .. } if operator == "who"));
    assert!(!err.is_internal());
}

#[test]
fn test_text_supports_only_concat_and_equality() {
    for op in ["<", "-", "*", "and"] {
        let err = compile_err(vec![Node::call(
            "print",
            Node::binary(op, Node::text("a"), Node::text("b")),
        )]);
        assert!(
            matches!(err, Error::InvalidOperator { ref operator, .. } if operator == op),
            "{}: {:?}",
            op,
            err
        );
        assert_eq!(err.hint(), Some("strings support only: + = !="));
    }

    let err = compile_err(vec![Node::call(
        "print",
        Node::binary("-", Node::text("a"), Node::num(1.0)),
    )]);
    assert!(matches!(err, Error::InvalidOperator { .. }));

    let result = compile(
        vec![Node::call("print", Node::binary("+", Node::text("a"), Node::num(1.0)))],
        &[],
    );
    assert_eq!(result.module.function("main").unwrap().count_calls(runtime::STRING_CONCAT), 1);
}

#[test]
fn test_boolean_constants() {
    let result = compile(
        vec![
            Node::assign("flag", Node::ident("True")),
            Node::call("print", Node::ident("True")),
            Node::call("print", Node::ident("False")),
            when(Node::ident("flag"), vec![Node::call("print", Node::num(1.0))]),
        ],
        &[],
    );
    let main = result.module.function("main").unwrap();
    let printed = call_args(main, runtime::PRINT_DOUBLE);
    assert_eq!(printed[0], &[Value::float(1.0)]);
    assert_eq!(printed[1], &[Value::float(0.0)]);
    assert!(result.module.global("True").is_none());
    assert!(result.verification.unwrap().valid);
}

#[test]
fn test_variable_read_of_function_symbol_is_diagnosed() {
    // define foo as n: return n
    // define f as: a is foo; return foo of 1
    let err = compile_err(vec![
        function("foo", &["n"], vec![ret(Node::ident("n"))]),
        function(
            "f",
            &[],
            vec![
                Node::assign("a", Node::ident("foo")),
                ret(Node::call("foo", Node::num(1.0))),
            ],
        ),
    ]);
    assert!(matches!(err, Error::SymbolConflict { ref symbol, .. } if symbol == "foo"));
    assert!(!err.is_internal());
    assert_eq!(err.classify(), ErrorKind::Diagnostic);
    assert!(err.hint().unwrap().contains("rename"));

    // an unknown name both read and called
    let err = compile_err(vec![function(
        "g",
        &[],
        vec![
            Node::assign("a", Node::ident("bar")),
            ret(Node::call("bar", Node::num(1.0))),
        ],
    )]);
    assert!(matches!(err, Error::SymbolConflict { ref symbol, .. } if symbol == "bar"));
}

#[test]
fn test_nested_function_is_internal_error() {
    let err = compile_err(vec![function(
        "outer",
        &[],
        vec![function("inner", &[], vec![])],
    )]);
    assert!(err.is_internal());
    assert_eq!(err.classify(), ErrorKind::Defect);
}

#[test]
fn test_unknown_node_kind_rejected() {
    let err = SourceUnit::from_json(r#"{"statements": [{"kind": "lambda", "body": []}]}"#)
        .unwrap_err();
    assert!(matches!(err, Error::InputFormat(_)));
}

// =============================================================================
// OUTPUT
// =============================================================================

#[test]
fn test_compile_from_json() {
    let json = r#"{
        "statements": [
            {"kind": "assignment", "name": "x", "value": {"kind": "literal", "value": 10.5}},
            {"kind": "relation",
             "callee": {"kind": "identifier", "name": "print"},
             "argument": {"kind": "identifier", "name": "x"}}
        ],
        "observed": ["x"]
    }"#;
    let result = Compiler::new(options(&[])).compile_json(json).unwrap();
    assert!(result.ir_text.starts_with("; ModuleID = 'main'"));
    assert!(result
        .ir_text
        .contains("target triple = \"x86_64-unknown-linux-gnu\""));
    assert!(result.ir_text.contains("call ptr @eigen_create(double 0x4025000000000000)"));
    assert_eq!(result.cleanup_count, 1);
}

#[test]
fn test_output_is_deterministic() {
    let program = || {
        vec![
            Node::assign("s", Node::text("a")),
            Node::assign("x", Node::num(1.0)),
            function("f", &["a"], vec![ret(Node::ident("a"))]),
            when(
                Node::binary("<", Node::ident("x"), Node::num(2.0)),
                vec![Node::call("print", Node::call("f", Node::ident("s")))],
            ),
        ]
    };
    let first = compile(program(), &["x"]);
    let second = compile(program(), &["x"]);
    assert_eq!(first.ir_text, second.ir_text);
}

#[test]
fn test_generated_modules_verify() {
    let result = compile(
        vec![
            Node::StructDef {
                name: "Pair".into(),
                fields: vec!["a".into(), "b".into()],
            },
            Node::assign("x", Node::num(3.0)),
            Node::assign("name", Node::text("eigen")),
            Node::assign("xs", Node::list(vec![Node::ident("x")])),
            function(
                "first",
                &["p"],
                vec![ret(Node::MemberAccess {
                    object: Box::new(Node::ident("p")),
                    member: "a".into(),
                })],
            ),
            Node::assign(
                "pair",
                Node::StructLiteral {
                    name: "Pair".into(),
                    args: vec![Node::ident("name"), Node::ident("x")],
                },
            ),
            Node::call("print", Node::call("first", Node::ident("pair"))),
            Node::call("print", Node::call("str", Node::ident("x"))),
            Node::call("print", Node::call("num", Node::text("4.5"))),
        ],
        &["x"],
    );

    let verification = Verifier::new().verify(&result.module);
    assert!(verification.valid, "{:?}", verification.errors);
    assert_eq!(verification.stats.function_count, 2);
    assert_eq!(result.ir_instruction_count, result.module.instruction_count());
}

#[test]
fn test_wasm_target_uses_narrow_size_type() {
    let mut options = options(&[]);
    options.target = Some("wasm32-unknown-unknown".into());
    let unit = SourceUnit::new(vec![
        Node::StructDef {
            name: "P".into(),
            fields: vec!["x".into()],
        },
        Node::assign(
            "p",
            Node::StructLiteral {
                name: "P".into(),
                args: vec![Node::num(1.0)],
            },
        ),
    ]);
    let result = Compiler::new(options).compile(&unit).unwrap();
    assert!(result.ir_text.contains("call ptr @malloc(i32 8)"));
    assert!(result.ir_text.contains("declare ptr @malloc(i32)"));
}
