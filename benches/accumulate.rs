use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cv_vessel::{Accumulator, Value, ValueRegistry, VesselOptions};

/// One output per "atom pair", each with 6 derivatives mapped onto a shared
/// force array of `3 * natoms` slots.
fn pair_accumulator(noutputs: usize, natoms: usize) -> (Accumulator<f64>, ValueRegistry<f64>) {
    let mut registry = ValueRegistry::new();
    let mut acc = Accumulator::new(VesselOptions::new("PAIRS", "bench"));
    for i in 0..noutputs {
        let h = acc.add_output(&mut registry, &format!("p{i}")).unwrap();
        registry.get_mut(h).resize_derivatives(6);
    }
    acc.resize(&registry);
    for i in 0..noutputs {
        let a = i % natoms;
        let b = (i * 7 + 1) % natoms;
        acc.set_derivative_indices(
            i,
            vec![3 * a, 3 * a + 1, 3 * a + 2, 3 * b, 3 * b + 1, 3 * b + 2],
        );
    }
    (acc, registry)
}

fn contribution(i: usize) -> Value<f64> {
    let mut v = Value::with_derivatives(6);
    v.set(0.1 * i as f64);
    for j in 0..6 {
        v.set_derivative(j, ((i + j) as f64).sin());
    }
    v
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate_cycle");
    for n in [10, 100, 1000] {
        let (mut acc, mut registry) = pair_accumulator(n, 64);
        let contributions: Vec<Value<f64>> = (0..n).map(contribution).collect();

        group.bench_with_input(BenchmarkId::new("accumulate_finish", n), &n, |b, &n| {
            b.iter(|| {
                acc.clear();
                for i in 0..n {
                    acc.accumulate(i, black_box(&contributions[i]));
                }
                acc.finish(&mut registry);
            })
        });
    }
    group.finish();
}

fn bench_apply_force(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_force");
    for n in [10, 100, 1000] {
        let (mut acc, mut registry) = pair_accumulator(n, 64);
        for i in 0..n {
            acc.accumulate(i, &contribution(i));
        }
        acc.finish(&mut registry);
        for i in 0..n {
            registry.get_mut(acc.output(i)).add_force(1.0);
        }
        let mut forces = vec![0.0; 3 * 64];

        group.bench_with_input(BenchmarkId::new("serial", n), &n, |b, _| {
            b.iter(|| black_box(acc.apply_force(&registry, black_box(&mut forces))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cycle, bench_apply_force);
criterion_main!(benches);
