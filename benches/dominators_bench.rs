use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cminor_mid::analysis::{compute_cfg_edges, compute_dominance_frontier, compute_dominator_tree, compute_rpo};
use cminor_mid::ir::{Builder, Context, Module, PrimType};

/// Build a diamond-chain function with `depth` diamonds in a row:
/// `@h_i` branches on a parameter into two arms that rejoin at `@j_i`,
/// which becomes `@h_{i+1}`'s predecessor.
fn diamond_chain(depth: usize) -> (Module, Context) {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module, Context::new());
    b.create_function(true, "chain", PrimType::W);
    let p = b.create_par(PrimType::W);

    for i in 0..depth {
        let then_label = b.create_label(format!("then{i}"));
        let else_label = b.create_label(format!("else{i}"));
        let join_label = b.create_label(format!("join{i}"));

        b.create_jnz(p, then_label, else_label);

        b.set_insert_block(then_label);
        let one = b.context_mut().intern_int(i as i32 + 1);
        b.create_add(PrimType::W, p, one);
        b.create_jmp(join_label);

        b.set_insert_block(else_label);
        let two = b.context_mut().intern_int(i as i32 + 2);
        b.create_add(PrimType::W, p, two);
        b.create_jmp(join_label);

        b.set_insert_block(join_label);
    }
    b.create_ret(Some(p));
    let ctx = b.into_context();
    (module, ctx)
}

fn dominators_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominator_tree_construction");
    for depth in [8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("diamond_chain", depth), &depth, |bench, &depth| {
            bench.iter_batched(
                || diamond_chain(depth),
                |(mut module, _ctx)| {
                    let func = &mut module.functions[0];
                    compute_cfg_edges(func);
                    compute_rpo(func);
                    compute_dominator_tree(func);
                    compute_dominance_frontier(func);
                    black_box(func.rpo.len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, dominators_benchmark);
criterion_main!(benches);
