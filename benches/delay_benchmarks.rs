use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use RustElmore::*;

fn synthetic_spef(nets: usize, nodes_per_net: usize) -> String {
    let mut spef = String::from("*SPEF \"IEEE 1481-1998\"\n*NAME_MAP\n");
    for i in 0..nets {
        spef.push_str(&format!("*{} top/net_{}\n", i + 1, i));
    }
    for i in 0..nets {
        spef.push_str(&format!("*D_NET *{} 1.0\n*CONN\n", i + 1));
        spef.push_str("*I *d:Z O *C 0 0\n");
        spef.push_str(&format!("*I *l{}:A I *C 0 0\n", nodes_per_net - 1));
        spef.push_str("*CAP\n");
        for n in 0..nodes_per_net {
            spef.push_str(&format!("{} *n{} 0.25\n", n + 1, n));
        }
        spef.push_str("*RES\n");
        for n in 1..nodes_per_net {
            spef.push_str(&format!("{} *n{} *n{} 1.5\n", n, n - 1, n));
        }
        spef.push_str(&format!("{} *n0 *d:Z 0.5\n", nodes_per_net));
        spef.push_str(&format!(
            "{} *n{} *l{}:A 0.5\n",
            nodes_per_net + 1,
            nodes_per_net - 1,
            nodes_per_net - 1
        ));
        spef.push_str("*END\n");
    }
    spef
}

fn chain_tree(n: usize) -> (RCTree, RCTreeMatrix, Vec<String>) {
    let ids: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
    let mut adj = RCTree::new(1.0, 1.0);
    let mut mat = RCTreeMatrix::new(1.0, 1.0);
    for i in 1..n {
        adj.add_edge(&ids[i - 1], &ids[i], 1.5);
        mat.add_edge(&ids[i - 1], &ids[i], 1.5);
    }
    for id in &ids {
        adj.set_node_cap(id, 0.25);
        mat.set_node_cap(id, 0.25);
    }
    (adj, mat, ids)
}

fn bench_spef_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("spef_parsing");

    let content = synthetic_spef(50, 20);

    group.bench_function("parse_50_nets", |b| {
        b.iter(|| {
            let parser = SpefParser::from_content(&content);
            parser.nets(&content).count()
        });
    });

    group.bench_function("analyze_50_nets", |b| {
        b.iter(|| {
            let mut analyzer = Analyzer::new();
            analyzer.run_content(&content).unwrap();
            analyzer.results().unwrap().nets.len()
        });
    });

    group.finish();
}

fn bench_engine_variants(c: &mut Criterion) {
    let mut group = c.benchmark_group("elmore_engine");

    for size in [10, 50, 100, 200].iter() {
        group.bench_with_input(BenchmarkId::new("adjacency", size), size, |b, &size| {
            let (adj, _, ids) = chain_tree(size);
            let loads = vec![ids[size - 1].clone()];
            let engine = ElmoreEngine::new(false);

            b.iter(|| engine.delays(&adj, &ids[0], &loads));
        });

        group.bench_with_input(BenchmarkId::new("matrix", size), size, |b, &size| {
            let (_, mut mat, ids) = chain_tree(size);
            let loads = vec![ids[size - 1].clone()];
            let engine = ElmoreEngine::new(false);
            mat.build();

            b.iter(|| engine.delays_matrix(&mut mat, &ids[0], &loads));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spef_parsing, bench_engine_variants);
criterion_main!(benches);
