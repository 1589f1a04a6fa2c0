#![allow(clippy::unwrap_used, clippy::missing_docs_in_private_items)]

use std::{
    hint::black_box,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use observable_subject::{FailureAction, FailureCollector, Subject, observer};

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(1))
        .warm_up_time(Duration::from_secs(1))
}

/// Subject with `count` observers summing the delivered value.
fn summing_subject(count: usize, action: FailureAction<u64>) -> (Subject<u64>, Arc<AtomicU64>) {
    let subject = Subject::builder()
        .initial_state(1)
        .failure_action(action)
        .build()
        .unwrap();
    let total = Arc::new(AtomicU64::new(0));
    for _ in 0..count {
        let total = Arc::clone(&total);
        subject
            .add_observer(observer::from_fn(move |v: &u64| {
                total.fetch_add(*v, Ordering::Relaxed);
                Ok(())
            }))
            .unwrap();
    }
    (subject, total)
}

fn fanout_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Subject notification");

    for count in [1_usize, 16, 256] {
        let (subject, total) = summing_subject(count, FailureAction::Rethrow);
        group.bench_function(format!("notify_{count}_observers"), |b| {
            b.iter(|| subject.notify_observers().unwrap());
        });
        black_box(total.load(Ordering::Relaxed));
    }

    // Every other observer fails and is collected
    group.bench_function("collect_128_failures", |b| {
        b.iter_batched(
            || {
                let collector = Arc::new(FailureCollector::new());
                let subject = Subject::builder()
                    .initial_state(0_u64)
                    .failure_action(FailureAction::Collect(Arc::clone(&collector)))
                    .build()
                    .unwrap();
                for i in 0..256_u64 {
                    subject
                        .add_observer(observer::from_fn(move |_: &u64| {
                            if i % 2 == 0 {
                                Err("even".into())
                            } else {
                                Ok(())
                            }
                        }))
                        .unwrap();
                }
                (subject, collector)
            },
            |(subject, collector)| {
                subject.notify_observers().unwrap();
                black_box(collector.drain().len())
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("add_remove", |b| {
        let subject = Subject::new(0_u64);
        b.iter(|| {
            let handle = subject
                .add_observer(observer::from_fn(|_: &u64| Ok(())))
                .unwrap();
            subject.remove_observer(handle).unwrap()
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = fanout_bench
}
criterion_main!(benches);
