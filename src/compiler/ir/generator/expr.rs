//! Expression lowering: literals, names, operators, calls and builtins.

use super::abi::{self, AbiSlot, ArgumentFit};
use super::linkage::{self, LinkageResolver};
use super::placement::Scope;
use super::{repr, IrGenerator, Typed, ValueKind};
use crate::ast::{Literal, Node};
use crate::compiler::ir::instruction::{BinOp, CastOp, FloatPred, IntPred, Value};
use crate::compiler::ir::types::{IrType, STRUCT_FIELD_BYTES};
use crate::compiler::runtime::{self, INTERROGATIVES, MATH_UNARY, PREDICATES};
use crate::{Error, Result};

const BINARY_OPERATORS: &str = "+ - * / % = != < > <= >= and or";
const TEXT_OPERATORS: &str = "+ = !=";

impl IrGenerator {
    /// Generate an expression
    pub(super) fn generate_expr(&mut self, node: &Node) -> Result<Typed> {
        match node {
            Node::Literal { value } => self.generate_literal(value),

            Node::Identifier { name } => self.generate_identifier(name),

            Node::Binary { op, left, right } => {
                let lhs = self.generate_expr(left)?;
                let rhs = self.generate_expr(right)?;
                self.generate_binary(op, lhs, rhs)
            }

            Node::Unary { op, operand } => {
                let v = self.generate_expr(operand)?;
                match op.as_str() {
                    "not" => {
                        let flag = repr::to_boolean(&mut self.builder, &v)?;
                        let flipped = self.builder.binary(BinOp::Xor, flag, Value::bool(true));
                        Ok(Typed::scalar(flipped))
                    }
                    "-" => {
                        let scalar = repr::to_scalar(&mut self.builder, &v);
                        Ok(Typed::scalar(self.builder.fneg(scalar)))
                    }
                    other => Err(Error::invalid_operator(
                        other,
                        "supported unary operators: not -",
                    )),
                }
            }

            Node::ListLiteral { elements } => self.generate_list_literal(elements),

            Node::Index { list, index } => {
                let target = self.generate_expr(list)?;
                let position = self.generate_position(index)?;
                match target.kind {
                    ValueKind::Text => {
                        let code = self.builder.call(
                            IrType::I64,
                            runtime::CHAR_AT,
                            vec![target.value, position],
                        );
                        let code = self.builder.cast(CastOp::SiToFp, code, IrType::Double);
                        Ok(Typed::scalar(code))
                    }
                    ValueKind::List | ValueKind::Packed => {
                        let list = repr::coerce(&mut self.builder, &target, &ValueKind::List)?;
                        let element = self.builder.call(
                            IrType::Double,
                            runtime::LIST_GET,
                            vec![list.value, position],
                        );
                        // Elements are untyped like ABI words; the use decides
                        let word = self.builder.cast(CastOp::BitCast, element, IrType::I64);
                        Ok(Typed::packed(word))
                    }
                    other => Err(Error::invalid_operator(
                        "[]",
                        format!("indexing applies to lists and strings, not {}", other),
                    )),
                }
            }

            Node::MemberAccess { object, member } => self.generate_member_access(object, member),

            Node::StructLiteral { name, args } => self.generate_struct_literal(name, args),

            Node::Interrogative { word, target } => self.generate_interrogative(word, target),

            Node::Relation { callee, argument } => self.generate_relation(callee, argument),

            Node::Assignment { .. }
            | Node::IndexedAssignment { .. }
            | Node::FunctionDef { .. }
            | Node::Return { .. }
            | Node::Break
            | Node::Conditional { .. }
            | Node::Loop { .. }
            | Node::StructDef { .. }
            | Node::Import { .. } => Err(Error::internal(format!(
                "{} used as an expression",
                node.kind_name()
            ))),
        }
    }

    /// `target[index] is value`
    pub(super) fn generate_indexed_store(
        &mut self,
        target: &Node,
        index: &Node,
        value: &Node,
    ) -> Result<()> {
        let list = self.generate_expr(target)?;
        let list = match list.kind {
            ValueKind::List | ValueKind::Packed => {
                repr::coerce(&mut self.builder, &list, &ValueKind::List)?
            }
            other => {
                return Err(Error::invalid_operator(
                    "[]",
                    format!("only list elements can be assigned, not {}", other),
                ))
            }
        };
        let position = self.generate_position(index)?;
        let v = self.generate_expr(value)?;
        let scalar = repr::to_scalar(&mut self.builder, &v);
        self.builder
            .call_void(runtime::LIST_SET, vec![list.value, position, scalar]);
        Ok(())
    }

    // ==================== Literals and names ====================

    fn generate_literal(&mut self, literal: &Literal) -> Result<Typed> {
        match literal {
            Literal::Number(n) => Ok(Typed::scalar(Value::float(*n))),
            Literal::Null => Ok(Typed::scalar(Value::float(0.0))),
            Literal::String(text) => {
                let bytes = self.string_constant(text);
                let handle = self
                    .builder
                    .call(IrType::Ptr, runtime::STRING_CREATE, vec![bytes]);
                self.track_allocation(&handle, runtime::STRING_DESTROY);
                Ok(Typed::text(handle))
            }
        }
    }

    fn generate_list_literal(&mut self, elements: &[Node]) -> Result<Typed> {
        let count = Value::int(IrType::I64, elements.len() as i64);
        let list = self
            .builder
            .call(IrType::Ptr, runtime::LIST_CREATE, vec![count]);
        self.track_allocation(&list, runtime::LIST_DESTROY);
        for (i, element) in elements.iter().enumerate() {
            let v = self.generate_expr(element)?;
            let scalar = repr::to_scalar(&mut self.builder, &v);
            self.builder.call_void(
                runtime::LIST_SET,
                vec![list.clone(), Value::int(IrType::I64, i as i64), scalar],
            );
        }
        Ok(Typed::list(list))
    }

    /// Resolve a name: boolean constants, locals, globals, predicates, then
    /// the linker
    pub(super) fn generate_identifier(&mut self, name: &str) -> Result<Typed> {
        match name {
            "True" => return Ok(Typed::scalar(Value::bool(true))),
            "False" => return Ok(Typed::scalar(Value::bool(false))),
            _ => {}
        }
        if let Some(binding) = self.lookup(name).cloned() {
            return Ok(self.load_binding(&binding));
        }
        if self.scope == Scope::Function {
            if let Some(global) = self.globals.get(name) {
                return Err(Error::internal(format!(
                    "top-level '{}' lives in {} and is not addressable from a function",
                    name, global.slot
                )));
            }
        }
        if let Some(predicate) = PREDICATES.get(name) {
            return self.generate_predicate(predicate.check);
        }

        let in_entry = self.scope == Scope::TopLevel;
        if self.linker.may_defer(name, in_entry) {
            return self.load_external(name);
        }
        let hint = linkage::undefined_hint(name, &self.visible_names());
        Err(Error::undefined(name, Some(hint)))
    }

    /// Read another module's exported word; the use site decodes it
    fn load_external(&mut self, symbol: &str) -> Result<Typed> {
        if self.defines_function(symbol) {
            return Err(linkage::symbol_conflict(symbol, "read as a variable"));
        }
        let binding = self.linker.external_global(&mut self.module, symbol)?;
        Ok(self.load_binding(&binding))
    }

    /// True when a user function of this unit is emitted as `symbol`
    fn defines_function(&self, symbol: &str) -> bool {
        self.functions.values().any(|f| f.symbol == symbol)
    }

    /// Index expression as an `i64`
    fn generate_position(&mut self, index: &Node) -> Result<Value> {
        let v = self.generate_expr(index)?;
        let scalar = repr::to_scalar(&mut self.builder, &v);
        Ok(self.builder.cast(CastOp::FpToSi, scalar, IrType::I64))
    }

    /// Bare predicate: tests the most recently bound name
    fn generate_predicate(&mut self, check: &'static str) -> Result<Typed> {
        let subject = self
            .last_bound
            .clone()
            .and_then(|name| self.lookup(&name).cloned());
        match subject {
            Some(binding) if binding.class.is_tracked() => {
                let record = self.builder.load(IrType::Ptr, binding.slot);
                Ok(Typed::scalar(self.builder.call(IrType::BOOL, check, vec![record])))
            }
            _ => Ok(Typed::scalar(Value::bool(false))),
        }
    }

    // ==================== Operators ====================

    fn generate_binary(&mut self, op: &str, lhs: Typed, rhs: Typed) -> Result<Typed> {
        let text_operand = lhs.kind == ValueKind::Text || rhs.kind == ValueKind::Text;
        if text_operand {
            return match op {
                "+" => self.generate_concat(&lhs, &rhs),
                "=" | "!=" => self.generate_text_equality(op, &lhs, &rhs),
                other => Err(Error::invalid_operator(
                    other,
                    format!("strings support only: {}", TEXT_OPERATORS),
                )),
            };
        }

        let float_op = match op {
            "+" => Some(BinOp::FAdd),
            "-" => Some(BinOp::FSub),
            "*" => Some(BinOp::FMul),
            "/" => Some(BinOp::FDiv),
            "%" => Some(BinOp::FRem),
            _ => None,
        };
        if let Some(bin) = float_op {
            let l = repr::to_scalar(&mut self.builder, &lhs);
            let r = repr::to_scalar(&mut self.builder, &rhs);
            return Ok(Typed::scalar(self.builder.binary(bin, l, r)));
        }

        let pred = match op {
            "=" => Some(FloatPred::Oeq),
            "!=" => Some(FloatPred::One),
            "<" => Some(FloatPred::Olt),
            ">" => Some(FloatPred::Ogt),
            "<=" => Some(FloatPred::Ole),
            ">=" => Some(FloatPred::Oge),
            _ => None,
        };
        if let Some(pred) = pred {
            let l = repr::to_scalar(&mut self.builder, &lhs);
            let r = repr::to_scalar(&mut self.builder, &rhs);
            return Ok(Typed::scalar(self.builder.fcmp(pred, l, r)));
        }

        let logic = match op {
            "and" => BinOp::And,
            "or" => BinOp::Or,
            other => {
                return Err(Error::invalid_operator(
                    other,
                    format!("supported operators: {}", BINARY_OPERATORS),
                ))
            }
        };
        let l = repr::to_boolean(&mut self.builder, &lhs)?;
        let r = repr::to_boolean(&mut self.builder, &rhs)?;
        Ok(Typed::scalar(self.builder.binary(logic, l, r)))
    }

    /// Operand of a string operation as a string handle
    fn as_text(&mut self, v: &Typed) -> Result<Value> {
        match v.kind {
            ValueKind::Text => Ok(v.value.clone()),
            ValueKind::Packed => Ok(repr::coerce(&mut self.builder, v, &ValueKind::Text)?.value),
            ValueKind::Scalar | ValueKind::Tracked => {
                let scalar = repr::to_scalar(&mut self.builder, v);
                let text = self
                    .builder
                    .call(IrType::Ptr, runtime::NUMBER_TO_STRING, vec![scalar]);
                self.track_allocation(&text, runtime::STRING_DESTROY);
                Ok(text)
            }
            ValueKind::List | ValueKind::Struct(_) => Err(Error::invalid_operator(
                "+",
                format!("cannot combine {} with a string", v.kind),
            )),
        }
    }

    fn generate_concat(&mut self, lhs: &Typed, rhs: &Typed) -> Result<Typed> {
        let l = self.as_text(lhs)?;
        let r = self.as_text(rhs)?;
        let joined = self
            .builder
            .call(IrType::Ptr, runtime::STRING_CONCAT, vec![l, r]);
        self.track_allocation(&joined, runtime::STRING_DESTROY);
        Ok(Typed::text(joined))
    }

    fn generate_text_equality(&mut self, op: &str, lhs: &Typed, rhs: &Typed) -> Result<Typed> {
        let textual = |k: &ValueKind| matches!(k, ValueKind::Text | ValueKind::Packed);
        if !(textual(&lhs.kind) && textual(&rhs.kind)) {
            // A string never equals a number
            return Ok(Typed::scalar(Value::bool(op == "!=")));
        }
        let l = self.as_text(lhs)?;
        let r = self.as_text(rhs)?;
        let same = self
            .builder
            .call(IrType::I64, runtime::STRING_EQUALS, vec![l, r]);
        let pred = if op == "=" { IntPred::Ne } else { IntPred::Eq };
        Ok(Typed::scalar(
            self.builder.icmp(pred, same, Value::int(IrType::I64, 0)),
        ))
    }

    // ==================== Structs and members ====================

    fn generate_struct_literal(&mut self, name: &str, args: &[Node]) -> Result<Typed> {
        let fields = match self.structs.get(name) {
            Some(fields) => fields.clone(),
            None => {
                let mut known: Vec<&str> = self.structs.keys().map(String::as_str).collect();
                known.sort_unstable();
                let hint = if known.is_empty() {
                    "No struct types declared yet".to_string()
                } else {
                    format!("Known struct types: {}", known.join(", "))
                };
                return Err(Error::UnknownStruct {
                    name: name.to_string(),
                    hint: Some(hint),
                });
            }
        };
        if fields.len() != args.len() {
            return Err(Error::StructArity {
                name: name.to_string(),
                expected: fields.len(),
                got: args.len(),
            });
        }

        let size = Value::int(
            self.target.size_type(),
            (fields.len() as u64 * STRUCT_FIELD_BYTES) as i64,
        );
        let instance = self.builder.call(IrType::Ptr, runtime::MALLOC, vec![size]);
        for (i, arg) in args.iter().enumerate() {
            let v = self.generate_expr(arg)?;
            let v = self.normalize_for_abi(&v);
            let word = abi::pack(&mut self.builder, &v);
            let field = self
                .builder
                .gep(IrType::I64, instance.clone(), Value::int(IrType::I64, i as i64));
            self.builder.store(word, field);
        }
        Ok(Typed::structure(instance, name))
    }

    fn generate_member_access(&mut self, object: &Node, member: &str) -> Result<Typed> {
        // `module.member` when the object is not a bound name
        if let Node::Identifier { name: module } = object {
            if self.lookup(module).is_none() {
                let in_entry = self.scope == Scope::TopLevel;
                if self.linker.may_defer_member(module, member, in_entry) {
                    let symbol = LinkageResolver::member_symbol(module, member);
                    return self.load_external(&symbol);
                }
                return Err(Error::undefined(
                    format!("{}.{}", module, member),
                    Some(format!("Make sure module '{}' is imported", module)),
                ));
            }
        }

        let instance = self.generate_expr(object)?;
        let struct_name = match &instance.kind {
            ValueKind::Struct(name) => name.clone(),
            ValueKind::Packed => self.infer_struct(member)?,
            other => {
                return Err(Error::invalid_operator(
                    ".",
                    format!("member access applies to structs and modules, not {}", other),
                ))
            }
        };
        let instance = repr::coerce(
            &mut self.builder,
            &instance,
            &ValueKind::Struct(struct_name.clone()),
        )?;
        let fields = self.structs.get(&struct_name).cloned().unwrap_or_default();
        let index = fields.iter().position(|f| f == member).ok_or_else(|| {
            Error::undefined(
                format!("{}.{}", struct_name, member),
                Some(format!("'{}' has fields: {}", struct_name, fields.join(", "))),
            )
        })?;
        let field = self.builder.gep(
            IrType::I64,
            instance.value,
            Value::int(IrType::I64, index as i64),
        );
        Ok(Typed::packed(self.builder.load(IrType::I64, field)))
    }

    /// The one struct type declaring `member`
    fn infer_struct(&self, member: &str) -> Result<String> {
        let mut owners: Vec<&String> = self
            .structs
            .iter()
            .filter(|(_, fields)| fields.iter().any(|f| f == member))
            .map(|(name, _)| name)
            .collect();
        owners.sort();
        match owners.as_slice() {
            [only] => Ok((*only).clone()),
            [] => Err(Error::UnknownStruct {
                name: member.to_string(),
                hint: Some(format!("no struct declares a field named '{}'", member)),
            }),
            many => Err(Error::UnknownStruct {
                name: member.to_string(),
                hint: Some(format!(
                    "field '{}' is ambiguous between {}",
                    member,
                    many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                )),
            }),
        }
    }

    // ==================== Interrogatives ====================

    fn generate_interrogative(&mut self, word: &str, target: &Node) -> Result<Typed> {
        let question = INTERROGATIVES.get(word).copied().ok_or_else(|| {
            Error::invalid_operator(word, "supported interrogatives: what, why, how, when")
        })?;
        let subject = self.generate_expr(target)?;
        let Some(accessor) = question.accessor else {
            return Ok(subject);
        };
        if subject.kind != ValueKind::Tracked {
            return Ok(Typed::scalar(Value::float(question.fast_default)));
        }
        let ret = runtime::return_type(accessor, &self.target).unwrap_or(IrType::Double);
        let answer = self.builder.call(ret.clone(), accessor, vec![subject.value]);
        let answer = if ret.is_int() {
            self.builder.cast(CastOp::SiToFp, answer, IrType::Double)
        } else {
            answer
        };
        Ok(Typed::scalar(answer))
    }

    // ==================== Calls ====================

    /// `callee of argument`
    fn generate_relation(&mut self, callee: &Node, argument: &Node) -> Result<Typed> {
        match callee {
            Node::Identifier { name } => {
                if let Some(info) = self.functions.get(name).cloned() {
                    let arity = info.params.len();
                    let args = self.generate_arguments(argument, arity > 1)?;
                    return Ok(self.call_function(&info.symbol, name, arity, args));
                }
                if let Some(predicate) = PREDICATES.get(name.as_str()) {
                    let subject = self.generate_expr(argument)?;
                    if subject.kind != ValueKind::Tracked {
                        return Ok(Typed::scalar(Value::bool(false)));
                    }
                    let flag = self
                        .builder
                        .call(IrType::BOOL, predicate.check, vec![subject.value]);
                    return Ok(Typed::scalar(flag));
                }
                if let Some(result) = self.generate_builtin(name, argument)? {
                    return Ok(result);
                }
                let in_entry = self.scope == Scope::TopLevel;
                if !self.linker.may_defer(name, in_entry) {
                    let hint = linkage::undefined_hint(name, &self.visible_names());
                    return Err(Error::undefined(name.as_str(), Some(hint)));
                }
                self.call_external(name, argument)
            }
            Node::MemberAccess { object, member } => match object.as_ref() {
                Node::Identifier { name: module } => {
                    let in_entry = self.scope == Scope::TopLevel;
                    if !self.linker.may_defer_member(module, member, in_entry) {
                        return Err(Error::undefined(
                            format!("{}.{}", module, member),
                            Some(format!("Make sure module '{}' is imported", module)),
                        ));
                    }
                    let symbol = LinkageResolver::member_symbol(module, member);
                    self.call_external(&symbol, argument)
                }
                _ => Err(Error::invalid_operator(
                    "of",
                    "only named functions and module members can be called",
                )),
            },
            _ => Err(Error::invalid_operator(
                "of",
                "only named functions and module members can be called",
            )),
        }
    }

    /// Arguments of a call; a list literal spreads when `spread` is set
    fn generate_arguments(&mut self, argument: &Node, spread: bool) -> Result<Vec<Typed>> {
        match argument {
            Node::ListLiteral { elements } if spread => {
                elements.iter().map(|e| self.generate_expr(e)).collect()
            }
            other => Ok(vec![self.generate_expr(other)?]),
        }
    }

    fn call_external(&mut self, symbol: &str, argument: &Node) -> Result<Typed> {
        // A library calling its own member by module path
        if let Some(info) = self.functions.values().find(|f| f.symbol == symbol).cloned() {
            let arity = info.params.len();
            let args = self.generate_arguments(argument, arity > 1)?;
            return Ok(self.call_function(symbol, symbol, arity, args));
        }
        let spread = matches!(argument, Node::ListLiteral { elements } if elements.len() > 1);
        let args = self.generate_arguments(argument, spread)?;
        let arity = self
            .linker
            .external_function(&mut self.module, symbol, args.len())?;
        Ok(self.call_function(symbol, symbol, arity, args))
    }

    /// Pack, fit and pass `args`; the result stays packed until used
    fn call_function(&mut self, symbol: &str, name: &str, arity: usize, args: Vec<Typed>) -> Typed {
        let supplied = args.len();
        let mut slots = Vec::with_capacity(supplied);
        for arg in &args {
            let arg = self.normalize_for_abi(arg);
            slots.push(AbiSlot::from_typed(&mut self.builder, &arg));
        }
        let (slots, fit) = abi::fit_arguments(slots, arity);
        match fit {
            ArgumentFit::Exact => {}
            ArgumentFit::Padded(missing) => self.warn(format!(
                "call to '{}' passes {} of {} arguments; {} zero-filled",
                name, supplied, arity, missing
            )),
            ArgumentFit::Truncated(extra) => self.warn(format!(
                "call to '{}' passes {} arguments but takes {}; {} dropped",
                name, supplied, arity, extra
            )),
        }
        let words: Vec<Value> = slots
            .into_iter()
            .map(|slot| slot.erase(&mut self.builder))
            .collect();
        Typed::packed(self.builder.call(IrType::I64, symbol, words))
    }

    /// Builtin functions; `None` when `name` is not a builtin
    fn generate_builtin(&mut self, name: &str, argument: &Node) -> Result<Option<Typed>> {
        let result = match name {
            "print" => {
                let v = self.generate_expr(argument)?;
                match v.kind {
                    ValueKind::Text => {
                        self.builder
                            .call_void(runtime::PRINT_STRING, vec![v.value.clone()]);
                    }
                    ValueKind::Tracked => {
                        let scalar = repr::to_scalar(&mut self.builder, &v);
                        self.builder.call_void(runtime::PRINT_VAL, vec![scalar]);
                    }
                    ValueKind::Scalar | ValueKind::Packed => {
                        let scalar = repr::to_scalar(&mut self.builder, &v);
                        self.builder.call_void(runtime::PRINT_DOUBLE, vec![scalar]);
                    }
                    ValueKind::List | ValueKind::Struct(_) => {
                        return Err(Error::invalid_operator(
                            "print",
                            format!("print accepts numbers and strings, not {}", v.kind),
                        ))
                    }
                }
                Typed::scalar(Value::float(0.0))
            }

            "length" => {
                let v = self.generate_expr(argument)?;
                let count = match v.kind {
                    ValueKind::Text => {
                        self.builder
                            .call(IrType::I64, runtime::STRING_LENGTH, vec![v.value])
                    }
                    ValueKind::List | ValueKind::Packed => {
                        let list = repr::coerce(&mut self.builder, &v, &ValueKind::List)?;
                        self.builder
                            .call(IrType::I64, runtime::LIST_LENGTH, vec![list.value])
                    }
                    other => {
                        return Err(Error::invalid_operator(
                            "length",
                            format!("length applies to lists and strings, not {}", other),
                        ))
                    }
                };
                Typed::scalar(self.builder.cast(CastOp::SiToFp, count, IrType::Double))
            }

            "append" => {
                let Node::ListLiteral { elements } = argument else {
                    return Err(Error::invalid_operator("append", "usage: append of [list, value]"));
                };
                let [list, value] = elements.as_slice() else {
                    return Err(Error::invalid_operator("append", "usage: append of [list, value]"));
                };
                let list = self.generate_expr(list)?;
                let list = repr::coerce(&mut self.builder, &list, &ValueKind::List)?;
                let v = self.generate_expr(value)?;
                let scalar = repr::to_scalar(&mut self.builder, &v);
                self.builder
                    .call_void(runtime::LIST_APPEND, vec![list.value.clone(), scalar]);
                list
            }

            "str" => {
                let v = self.generate_expr(argument)?;
                match v.kind {
                    ValueKind::Text => v,
                    _ => {
                        let scalar = repr::to_scalar(&mut self.builder, &v);
                        let text =
                            self.builder
                                .call(IrType::Ptr, runtime::NUMBER_TO_STRING, vec![scalar]);
                        self.track_allocation(&text, runtime::STRING_DESTROY);
                        Typed::text(text)
                    }
                }
            }

            "num" => {
                let v = self.generate_expr(argument)?;
                match v.kind {
                    ValueKind::Text | ValueKind::Packed => {
                        let text = self.as_text(&v)?;
                        Typed::scalar(self.builder.call(
                            IrType::Double,
                            runtime::STRING_TO_NUMBER,
                            vec![text],
                        ))
                    }
                    _ => Typed::scalar(repr::to_scalar(&mut self.builder, &v)),
                }
            }

            "pow" => {
                let args = self.generate_arguments(argument, true)?;
                let [base, exponent] = args.as_slice() else {
                    return Err(Error::invalid_operator("pow", "usage: pow of [base, exponent]"));
                };
                let base = repr::to_scalar(&mut self.builder, base);
                let exponent = repr::to_scalar(&mut self.builder, exponent);
                Typed::scalar(self.builder.call(IrType::Double, "pow", vec![base, exponent]))
            }

            other => match MATH_UNARY.get(other) {
                Some(symbol) => {
                    let v = self.generate_expr(argument)?;
                    let scalar = repr::to_scalar(&mut self.builder, &v);
                    Typed::scalar(self.builder.call(IrType::Double, symbol, vec![scalar]))
                }
                None => return Ok(None),
            },
        };
        Ok(Some(result))
    }
}
