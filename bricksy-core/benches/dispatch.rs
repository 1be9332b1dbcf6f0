//! Dispatch and fan-out benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bricksy_core::{create_store, Subscription};

#[derive(Clone)]
struct Counter {
    count: i64,
    label: String,
}

fn bench_dispatch(c: &mut Criterion) {
    let store = create_store(Counter {
        count: 0,
        label: "bench".to_string(),
    });
    store
        .register_action("increment", |c: &Counter, n: &i64| Counter {
            count: c.count + n,
            ..c.clone()
        })
        .expect("fresh store");

    c.bench_function("dispatch_without_subscribers", |b| {
        b.iter(|| store.dispatch("increment", black_box(1_i64)))
    });

    c.bench_function("dispatch_unknown_name", |b| {
        b.iter(|| store.dispatch(black_box("missing"), 1_i64))
    });
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1_usize, 16, 256] {
        let store = create_store(Counter {
            count: 0,
            label: "bench".to_string(),
        });
        let subs: Vec<Subscription> = (0..subscribers)
            .map(|i| {
                if i % 2 == 0 {
                    store.select_with(|c| c.count).subscribe(|n| {
                        black_box(n);
                    })
                } else {
                    store.select_with(|c| c.label.len()).subscribe(|n| {
                        black_box(n);
                    })
                }
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    store.update_data(|c| Counter {
                        count: c.count + 1,
                        ..c.clone()
                    })
                })
            },
        );

        drop(subs);
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_fan_out);
criterion_main!(benches);
