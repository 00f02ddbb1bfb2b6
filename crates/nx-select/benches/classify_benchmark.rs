use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nx_core::RecordEvent;
use nx_select::{
    BinAccumulator, BinClassifier, EventSelector, OverlapPolicy, VariableSet, VariableSpec,
    fill_parallel,
};
use std::hint::black_box;

/// `n_slices` angular slices × 8 momentum bins.
fn make_classifier(n_slices: usize) -> BinClassifier {
    let mut text = String::new();
    let mut bin = 0;
    for s in 0..n_slices {
        let lo = -1.0 + 2.0 * s as f64 / n_slices as f64;
        let hi = -1.0 + 2.0 * (s + 1) as f64 / n_slices as f64;
        for k in 0..8 {
            let p_lo = 0.1 + 0.15 * k as f64;
            text.push_str(&format!("{bin} cos_mu in {lo} {hi}\n"));
            text.push_str(&format!("{bin} p_mu in {p_lo} {}\n", p_lo + 0.15));
            bin += 1;
        }
    }
    BinClassifier::from_text(&text).unwrap()
}

fn make_events(n: usize) -> Vec<RecordEvent> {
    // Deterministic pseudo-kinematics.
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.618_033_988_75;
            RecordEvent::new()
                .with("px", (t.sin() * 0.7).abs())
                .with("py", (t.cos() * 0.2).abs())
                .with("pz", (t * 1.3).sin())
        })
        .collect()
}

fn variables() -> VariableSet {
    VariableSet::new(&[
        VariableSpec::new("p_mu", "sqrt(px*px + py*py + pz*pz)"),
        VariableSpec::new("cos_mu", "pz / p_mu"),
    ])
    .unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_classify");
    let events = make_events(10_000);
    let vars = Arc::new(variables());

    for n_slices in [2usize, 6, 12] {
        let clf = Arc::new(make_classifier(n_slices));
        group.bench_with_input(BenchmarkId::new("sequential", n_slices), &n_slices, |b, _| {
            b.iter(|| {
                let mut sel = EventSelector::new(clf.clone(), vars.clone());
                let mut acc = BinAccumulator::new(clf.n_bins());
                for ev in &events {
                    sel.process(ev, &mut acc);
                }
                black_box(acc)
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel", n_slices), &n_slices, |b, _| {
            b.iter(|| black_box(fill_parallel(&clf, &vars, OverlapPolicy::EveryMatch, &events)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
