use calc_core::{CalcConfig, Category};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_generate(c: &mut Criterion) {
    let mut calc = calc_runtime::Calculator::with_config(&CalcConfig {
        initial_days: 30,
        initial_military: 12,
        initial_economy: 12,
        rng_seed: Some(42),
    });
    calc.set_sync_pair_mode(true);
    for day in 0..30 {
        calc.set_cell_value(Category::Military, day % 12, day, (day * 5) as f64);
    }
    c.bench_function("generate_30x24", |b| {
        b.iter(|| {
            calc.generate();
            black_box(calc.sum_all().report().copied())
        })
    });
}

fn bench_global_edit(c: &mut Criterion) {
    let mut calc = calc_runtime::Calculator::with_config(&CalcConfig {
        initial_days: 30,
        initial_military: 12,
        initial_economy: 12,
        rng_seed: Some(42),
    });
    calc.set_sync_global_mode(true);
    let mut v = 0.0;
    c.bench_function("global_edit", |b| {
        b.iter(|| {
            v += 1.0;
            black_box(calc.set_cell_value(Category::Economy, 5, 17, v))
        })
    });
}

criterion_group!(benches, bench_generate, bench_global_edit);
criterion_main!(benches);
