//! Property-based tests: the front end never panics on arbitrary input,
//! and the scalar passes are idempotent on whatever real programs the
//! generator produces.

use cminor_mid::analysis::{compute_cfg_edges, compute_dominance_frontier, compute_dominator_tree, compute_rpo};
use cminor_mid::frontend::{lexer, parser};
use cminor_mid::opt;
use cminor_mid::pipeline;
use cminor_mid::ssa;
use proptest::prelude::*;

fn arbitrary_source_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[ -~\n]{0,300}").unwrap()
}

fn int_literal() -> impl Strategy<Value = i64> {
    0i64..1000
}

/// A small straight-line function over `+`, `-`, `*` on integer literals
/// and a single declared local, with an operator count in `size`.
fn straight_line_function(size: impl Into<proptest::collection::SizeRange>) -> impl Strategy<Value = String> {
    prop::collection::vec((prop_oneof![Just("+"), Just("-"), Just("*")], int_literal()), size).prop_map(|ops| {
        let mut body = String::from("0");
        for (op, n) in ops {
            body.push_str(&format!(" {op} {n}"));
        }
        format!("fn f(a: int) -> int {{ let x: int = {body}; return x + a; }}")
    })
}

proptest! {
    #[test]
    fn lexer_never_panics_on_arbitrary_bytes(src in arbitrary_source_text()) {
        let _ = lexer::Lexer::lex_all(&src);
    }

    #[test]
    fn parser_never_panics_on_arbitrary_bytes(src in arbitrary_source_text()) {
        let (_program, _errors) = parser::parse(&src);
    }

    #[test]
    fn generated_arithmetic_functions_always_compile(src in straight_line_function(0..12usize)) {
        let result = pipeline::compile(&src);
        prop_assert!(result.is_ok(), "well-typed generated source failed to compile: {:?}", result.err());
    }

    #[test]
    fn dce_is_idempotent_on_generated_functions(src in straight_line_function(1..12usize)) {
        let unit = cminor_mid::frontend::compile(&src);
        prop_assume!(!unit.tainted);
        let mut module = unit.module;
        let func = &mut module.functions[0];

        compute_cfg_edges(func);
        compute_rpo(func);
        compute_dominator_tree(func);
        compute_dominance_frontier(func);
        ssa::construct_ssa(func).unwrap();
        compute_cfg_edges(func);
        compute_rpo(func);
        compute_dominator_tree(func);
        cminor_mid::analysis::fill_uses(func);

        opt::dce::run(func);
        cminor_mid::analysis::fill_uses(func);
        let changed_again = opt::dce::run(func);
        prop_assert!(!changed_again, "a second DCE pass should find nothing left to remove");
    }

    #[test]
    fn simplify_cfg_is_idempotent_on_generated_functions(src in straight_line_function(1..12usize)) {
        let unit = cminor_mid::frontend::compile(&src);
        prop_assume!(!unit.tainted);
        let mut module = unit.module;
        let func = &mut module.functions[0];

        compute_cfg_edges(func);
        compute_rpo(func);
        compute_dominator_tree(func);
        compute_dominance_frontier(func);
        ssa::construct_ssa(func).unwrap();

        compute_cfg_edges(func);
        compute_rpo(func);
        opt::simplify_cfg::run(func);

        compute_cfg_edges(func);
        compute_rpo(func);
        let changed_again = opt::simplify_cfg::run(func);
        prop_assert!(!changed_again, "a second CFG-simplification pass should find nothing left to simplify");
    }
}
