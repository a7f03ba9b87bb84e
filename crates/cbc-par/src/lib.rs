//! Operator-precedence parser and bytecode emitter for the source
//! language, plus the top-level `compile` entry point that wires
//! lexing, parsing/emission, and linking together.

mod lvalue;
mod parser;

pub use lvalue::{Expr, LValue};
pub use parser::{ParseError, Parser};

use cbc_util::CompileError;

/// Compiles `source` into a linked flat byte array, or the first error
/// encountered anywhere in the pipeline. There is no partial output and
/// no diagnostic accumulation: lexing, parsing/emission, and linking
/// each short-circuit on their first failure.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    let tokens = cbc_lex::lex(source)?;
    let frag = Parser::new(tokens).parse_program()?;
    let bytes = cbc_link::link(&frag)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc_ir::Opcode;
    use pretty_assertions::assert_eq;

    fn op(byte: Opcode) -> u8 {
        byte.as_u8()
    }

    #[test]
    fn compiles_an_integer_expression_statement() {
        let bytes = compile("1 + 2;").unwrap();
        assert_eq!(
            bytes,
            vec![
                op(Opcode::LitInt),
                1,
                op(Opcode::LitInt),
                2,
                op(Opcode::OpAdd),
                op(Opcode::StPop),
            ]
        );
    }

    #[test]
    fn local_assignment_round_trips_through_get_local() {
        let bytes = compile("x = 5; x;").unwrap();
        // LIT_BYTES "x" + LIT_INT 5 + SET_LOCAL, then LIT_BYTES "x" + GET_LOCAL + ST_POP
        assert_eq!(bytes[0], op(Opcode::LitBytes));
        assert!(bytes.contains(&op(Opcode::SetLocal)));
        assert!(bytes.contains(&op(Opcode::GetLocal)));
    }

    #[test]
    fn compound_assignment_emits_dup_get_op_set() {
        let bytes = compile("x += 1;").unwrap();
        assert!(bytes.contains(&op(Opcode::StDup)));
        assert!(bytes.contains(&op(Opcode::GetLocal)));
        assert!(bytes.contains(&op(Opcode::OpAdd)));
        assert!(bytes.contains(&op(Opcode::SetLocal)));
    }

    #[test]
    fn del_on_a_non_lvalue_is_a_semantic_error() {
        let err = compile("del 1;").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn assigning_to_a_non_lvalue_is_a_semantic_error() {
        let err = compile("1 = 2;").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn goto_to_an_undefined_label_is_a_link_error() {
        let err = compile("goto nosuch;").unwrap_err();
        assert!(matches!(err, CompileError::Link { .. }));
    }

    #[test]
    fn continue_outside_any_loop_is_a_link_error() {
        let err = compile("continue;").unwrap_err();
        assert!(matches!(err, CompileError::Link { .. }));
    }

    #[test]
    fn duplicate_labels_are_a_semantic_error() {
        let err = compile("a: a: 1;").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn goto_forward_reference_resolves() {
        let bytes = compile("goto done; 1; done: 2;").unwrap();
        assert_eq!(bytes[0], op(Opcode::Jump));
        let target = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
        // The label sits right after the first statement's 5-byte JUMP
        // and the second statement's 3-byte `1;` (LIT_INT + StPop).
        assert_eq!(target, 5 + 3);
        assert_eq!(bytes[target], op(Opcode::LitInt));
    }

    #[test]
    fn while_loop_retargets_continue_and_break() {
        // If retargeting didn't rewrite the LoopContinue/LoopBreak
        // sentinels to this loop's start/end symbols, linking would
        // fail with an unresolved-symbol error.
        let bytes = compile("while (1) { continue; break; }");
        assert!(bytes.is_ok());
    }

    #[test]
    fn while_loop_emits_exact_bytecode_for_a_break_only_body() {
        // label(start)=0; LIT_INT 1; OP_NOT; JUMP_IF end; body (break ->
        // JUMP end); JUMP start; label(end)=18.
        let bytes = compile("while (1) { break; }").unwrap();
        assert_eq!(
            bytes,
            vec![
                op(Opcode::LitInt),
                1,
                op(Opcode::OpNot),
                op(Opcode::JumpIf),
                18,
                0,
                0,
                0,
                op(Opcode::Jump),
                18,
                0,
                0,
                0,
                op(Opcode::Jump),
                0,
                0,
                0,
                0,
            ]
        );
    }

    #[test]
    fn nested_loop_break_targets_innermost_loop() {
        // Outer loop's own break must still resolve once the inner loop
        // has already retargeted its own continue/break.
        let bytes = compile("while (1) { while (2) { break; } break; }");
        assert!(bytes.is_ok());
    }

    #[test]
    fn if_elif_else_chain_shares_one_end_symbol() {
        let bytes = compile("if (1) { 1; } elif (2) { 2; } else { 3; }").unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn if_else_emits_exact_bytecode() {
        // cond; OP_NOT; JUMP_IF tail=18; then-body (`a;`); JUMP end=23;
        // label(tail); else-body (`b;`); label(end).
        let bytes = compile("if (0) { a; } else { b; }").unwrap();
        assert_eq!(
            bytes,
            vec![
                op(Opcode::LitInt),
                0,
                op(Opcode::OpNot),
                op(Opcode::JumpIf),
                18,
                0,
                0,
                0,
                op(Opcode::LitBytes),
                1,
                b'a',
                op(Opcode::GetLocal),
                op(Opcode::StPop),
                op(Opcode::Jump),
                23,
                0,
                0,
                0,
                op(Opcode::LitBytes),
                1,
                b'b',
                op(Opcode::GetLocal),
                op(Opcode::StPop),
            ]
        );
    }

    #[test]
    fn for_loop_lowers_to_iterator_protocol() {
        let bytes = compile("for x in y { x; }").unwrap();
        assert!(bytes.contains(&op(Opcode::Try)));
        assert!(bytes.contains(&op(Opcode::TryEnd)));
        assert!(bytes.contains(&op(Opcode::RaiseIfNotStop)));
    }

    #[test]
    fn for_loop_break_emits_exact_iterator_setup_and_retargets_to_fragment_end() {
        // The `__for_1` local is bound to `xs.__iter__()` before the
        // loop's own `start` label, exactly as the iterator-protocol
        // desugaring specifies.
        let bytes = compile("for i in xs { break; }").unwrap();
        let expected_init = vec![
            op(Opcode::LitBytes),
            7,
            b'_',
            b'_',
            b'f',
            b'o',
            b'r',
            b'_',
            b'1',
            op(Opcode::LitBytes),
            2,
            b'x',
            b's',
            op(Opcode::GetLocal),
            op(Opcode::LitBytes),
            8,
            b'_',
            b'_',
            b'i',
            b't',
            b'e',
            b'r',
            b'_',
            b'_',
            op(Opcode::GetAttr),
            op(Opcode::TupleN),
            0,
            op(Opcode::Call),
            op(Opcode::SetLocal),
        ];
        assert_eq!(&bytes[..expected_init.len()], expected_init.as_slice());

        // Right after the iterator setup comes `start:`, then `TRY`.
        assert_eq!(bytes[expected_init.len()], op(Opcode::Try));

        // `break` inside the body resolves to the loop's `end`, which
        // sits at the very end of the fragment (just after the trailing
        // `RAISE_IF_NOT_STOP`).
        assert_eq!(*bytes.last().unwrap(), op(Opcode::RaiseIfNotStop));
        let try_end_pos = bytes.iter().position(|&b| b == op(Opcode::TryEnd)).unwrap();
        assert_eq!(bytes[try_end_pos + 1], op(Opcode::Jump));
        let break_target =
            u32::from_le_bytes(bytes[try_end_pos + 2..try_end_pos + 6].try_into().unwrap()) as usize;
        assert_eq!(break_target, bytes.len());
    }

    #[test]
    fn try_catch_binds_exception_via_swap_and_set_local() {
        let bytes = compile("try { 1; } catch e { e; }").unwrap();
        assert!(bytes.contains(&op(Opcode::Try)));
        assert!(bytes.contains(&op(Opcode::StSwap)));
        assert!(bytes.contains(&op(Opcode::SetLocal)));
    }

    #[test]
    fn short_circuit_and_or_use_dup_and_jump_if() {
        let bytes = compile("x and y;").unwrap();
        assert!(bytes.contains(&op(Opcode::StDup)));
        assert!(bytes.contains(&op(Opcode::OpNot)));
        assert!(bytes.contains(&op(Opcode::JumpIf)));

        let bytes = compile("x or y;").unwrap();
        assert!(bytes.contains(&op(Opcode::StDup)));
        assert!(bytes.contains(&op(Opcode::JumpIf)));
    }

    #[test]
    fn function_literal_embeds_a_linked_body_blob() {
        // The body is embedded as a length-prefixed byte string *before*
        // CLOSURE, not after: LIT_BYTES, ULEB128(body_len), body, CLOSURE.
        let bytes = compile("f = fn (a, b) { return a + b; };").unwrap();
        assert_eq!(
            bytes,
            vec![
                op(Opcode::LitBytes),
                1,
                b'f',
                op(Opcode::LitBytes),
                26,
                // per-param prologue: bind `a` (LOAD_ARGS[0]), then `b` (LOAD_ARGS[1])
                op(Opcode::LitBytes),
                1,
                b'a',
                op(Opcode::LoadArgs),
                op(Opcode::LitInt),
                0,
                op(Opcode::GetItem),
                op(Opcode::SetLocal),
                op(Opcode::LitBytes),
                1,
                b'b',
                op(Opcode::LoadArgs),
                op(Opcode::LitInt),
                1,
                op(Opcode::GetItem),
                op(Opcode::SetLocal),
                // return a + b;
                op(Opcode::LitBytes),
                1,
                b'a',
                op(Opcode::GetLocal),
                op(Opcode::LitBytes),
                1,
                b'b',
                op(Opcode::GetLocal),
                op(Opcode::OpAdd),
                op(Opcode::Return),
                op(Opcode::Closure),
                op(Opcode::SetLocal),
            ]
        );
    }

    #[test]
    fn function_literal_with_captures_uses_closure_bind() {
        // Same length-prefixed-body-first rule applies to CLOSURE_BIND,
        // which is then followed by ULEB128(capture count) and each
        // capture name as its own length-prefixed byte string.
        let bytes = compile("f = fn (a) [outer] { return a; };").unwrap();
        assert_eq!(
            bytes,
            vec![
                op(Opcode::LitBytes),
                1,
                b'f',
                op(Opcode::LitBytes),
                13,
                op(Opcode::LitBytes),
                1,
                b'a',
                op(Opcode::LoadArgs),
                op(Opcode::LitInt),
                0,
                op(Opcode::GetItem),
                op(Opcode::SetLocal),
                op(Opcode::LitBytes),
                1,
                b'a',
                op(Opcode::GetLocal),
                op(Opcode::Return),
                op(Opcode::ClosureBind),
                1,
                5,
                b'o',
                b'u',
                b't',
                b'e',
                b'r',
                op(Opcode::SetLocal),
            ]
        );
    }

    #[test]
    fn dangling_label_inside_function_body_fails_at_definition_site() {
        // continue/break cannot escape a function body: they must be
        // consumed by a loop within the same body.
        let err = compile("f = fn () { continue; };").unwrap_err();
        assert!(matches!(err, CompileError::Link { .. }));
    }

    #[test]
    fn class_literal_emits_dict_building_sequence() {
        let bytes = compile("Base = 1; Shape = class Circle (Base) { radius = 1; };").unwrap();
        assert!(bytes.contains(&op(Opcode::EmptyDict)));
        assert!(bytes.contains(&op(Opcode::SetItem)));
        assert!(bytes.contains(&op(Opcode::Class)));
    }

    #[test]
    fn slice_expression_uses_lit_none_for_missing_bounds() {
        let bytes = compile("x[:];").unwrap();
        assert!(bytes.contains(&op(Opcode::LitSlice)));
        assert_eq!(bytes.iter().filter(|&&b| b == op(Opcode::LitNone)).count(), 2);
    }

    #[test]
    fn call_and_spawn_both_use_tuple_n_for_arguments() {
        let bytes = compile("f(1, 2);").unwrap();
        assert!(bytes.contains(&op(Opcode::TupleN)));
        assert!(bytes.contains(&op(Opcode::Call)));

        let bytes = compile("spawn f(1, 2);").unwrap();
        assert!(bytes.contains(&op(Opcode::TupleN)));
        assert!(bytes.contains(&op(Opcode::Spawn)));
    }

    #[test]
    fn list_literal_uses_tuple_n() {
        let bytes = compile("[1, 2, 3];").unwrap();
        assert!(bytes.contains(&op(Opcode::TupleN)));
    }

    #[test]
    fn lex_error_propagates_as_compile_error() {
        let err = compile("1 @ 2;").unwrap_err();
        assert!(matches!(err, CompileError::Lex { .. }));
    }

    #[test]
    fn parse_error_on_malformed_input() {
        let err = compile("if 1 { }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
