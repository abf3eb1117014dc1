//! This bench test simulates handing out whole cases, one after another, from a
//! large store of doables until no eligible case remains.

#![allow(missing_docs)]

use chrono::{Duration, TimeZone, Utc};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use doables::{
    Allocations, Allocator, Doable, DoableStore, DoableType, User, UserStore,
    domain::{CaseId, DoableId, UserId},
};

const CASES: u32 = 500;
const DOABLES_PER_CASE: u32 = 4;

/// Generates a store of cases, each holding a few tasks and an email.
fn preseed_store() -> DoableStore {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut doables = Vec::new();
    for case in 1..=CASES {
        let case_id = CaseId::new(format!("case_{case}")).unwrap();
        for n in 0..DOABLES_PER_CASE {
            let doable_type = if n == 0 {
                DoableType::Email
            } else {
                DoableType::Task
            };
            // interleave ages so the oldest case is not simply the first
            let age = Duration::minutes(i64::from((case * 7919 + n) % 10_000));
            let doable = Doable::new(
                DoableId::new(format!("doable_{n}_{case}")).unwrap(),
                "Work",
                doable_type,
            )
            .unwrap()
            .with_case(Some(case_id.clone()))
            .with_created_at(epoch + age);
            doables.push(doable);
        }
    }
    DoableStore::from_doables(doables).unwrap()
}

fn users() -> UserStore {
    let user = User::new("bench", "Bench")
        .unwrap()
        .with_id(UserId::new("u1").unwrap());
    UserStore::from_users([user]).unwrap()
}

fn allocate_cases(c: &mut Criterion) {
    let users = users();

    c.bench_function("allocate every case", |b| {
        b.iter_batched(
            || (preseed_store(), Allocations::default()),
            |(mut doables, mut allocations)| {
                let mut allocator = Allocator::new(&mut allocations, &mut doables, &users);
                while !allocator.allocate_case("u1", None).unwrap().is_empty() {}
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("allocate every case by type", |b| {
        b.iter_batched(
            || (preseed_store(), Allocations::default()),
            |(mut doables, mut allocations)| {
                let mut allocator = Allocator::new(&mut allocations, &mut doables, &users);
                while !allocator
                    .allocate_case("u1", Some(DoableType::Email))
                    .unwrap()
                    .is_empty()
                {}
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, allocate_cases);
criterion_main!(benches);
