// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Randomized operation sequences: active positions stay dense, users never
//! hold two live claims on one item, and without reorders the queue is FIFO.

use std::collections::HashMap;
use std::sync::Arc;

use claimline_core::{ClaimId, ClaimStatus, ItemId};
use claimline_test_utils::TestHarness;
use proptest::prelude::*;

const ITEMS: [&str; 2] = ["bike", "tent"];

#[derive(Debug, Clone)]
enum Op {
    Submit { item: usize, user: u8 },
    Advance { claim: usize, status: ClaimStatus },
    Move { claim: usize, position: i64 },
}

fn status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop::sample::select(ClaimStatus::ALL.to_vec())
}

fn op_strategy(allow_moves: bool) -> BoxedStrategy<Op> {
    let submit = (0..ITEMS.len(), 0u8..6).prop_map(|(item, user)| Op::Submit { item, user });
    let advance = (0usize..32, status_strategy())
        .prop_map(|(claim, status)| Op::Advance { claim, status });
    if allow_moves {
        let reorder =
            (0usize..32, 0i64..8).prop_map(|(claim, position)| Op::Move { claim, position });
        prop_oneof![3 => submit, 3 => advance, 2 => reorder].boxed()
    } else {
        prop_oneof![3 => submit, 2 => advance].boxed()
    }
}

/// Apply `ops`, ignoring rejected operations. Returns submitted claim ids in order.
async fn apply(h: &TestHarness, ops: &[Op]) -> Vec<ClaimId> {
    let mut submitted: Vec<ClaimId> = Vec::new();
    for op in ops {
        match op {
            Op::Submit { item, user } => {
                if let Ok(claim) = h.submit(ITEMS[*item], &format!("user-{user}")).await {
                    submitted.push(claim.id);
                }
            }
            Op::Advance { claim, status } if !submitted.is_empty() => {
                let id = &submitted[claim % submitted.len()];
                let _ = h.advance(id, *status).await;
            }
            Op::Move { claim, position } if !submitted.is_empty() => {
                let id = &submitted[claim % submitted.len()];
                let _ = h.move_to(id, *position).await;
            }
            _ => {}
        }
    }
    submitted
}

async fn assert_invariants(h: &TestHarness) {
    for item in ITEMS {
        h.assert_dense(item).await;

        let all = h.store.list_by_item(&ItemId::from(item), true).await.unwrap();
        let mut live: HashMap<String, usize> = HashMap::new();
        for claim in &all {
            if claim.status.is_live() {
                *live.entry(claim.user_id.0.clone()).or_default() += 1;
            }
            assert_eq!(claim.queue_position.is_some(), claim.status.is_active());
            for status in ClaimStatus::ALL {
                if status.is_terminal() {
                    assert_eq!(
                        claim.timestamp_for(status).is_some(),
                        claim.status == status,
                        "terminal timestamp of {} for {status}",
                        claim.id
                    );
                }
            }
        }
        assert!(live.values().all(|n| *n <= 1), "two live claims for one user on {item}");
    }
    assert!(h.store.density_violations().await.unwrap().is_empty());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op_strategy(true), 1..40)) {
        runtime().block_on(async {
            let h = TestHarness::builder().build().await.unwrap();
            apply(&h, &ops).await;
            assert_invariants(&h).await;
        });
    }

    #[test]
    fn without_reorders_heads_follow_submission_order(
        ops in prop::collection::vec(op_strategy(false), 1..40)
    ) {
        runtime().block_on(async {
            let h = TestHarness::builder().build().await.unwrap();
            let submitted = apply(&h, &ops).await;
            for item in ITEMS {
                let active = h.store.list_active_by_item(&ItemId::from(item)).await.unwrap();
                let order: Vec<usize> = active
                    .iter()
                    .map(|c| submitted.iter().position(|id| *id == c.id).unwrap())
                    .collect();
                let mut sorted = order.clone();
                sorted.sort_unstable();
                assert_eq!(order, sorted, "active set of {item} is not in submission order");
            }
        });
    }
}

#[test]
fn concurrent_random_operations_keep_positions_dense() {
    runtime().block_on(async {
        let h = Arc::new(TestHarness::builder().build().await.unwrap());
        let mut seeded = Vec::new();
        for i in 0..12 {
            seeded.push(h.submit("bike", &format!("seed-{i}")).await.unwrap().id);
        }

        let mut tasks = Vec::new();
        for (i, id) in seeded.iter().cloned().enumerate() {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                match i % 4 {
                    0 => {
                        let _ = h.advance(&id, ClaimStatus::Cancelled).await;
                    }
                    1 => {
                        let _ = h.move_to(&id, 1).await;
                    }
                    2 => {
                        let _ = h.advance(&id, ClaimStatus::Contacted).await;
                        let _ = h.advance(&id, ClaimStatus::Selected).await;
                    }
                    _ => {
                        let _ = h.submit("bike", &format!("late-{i}")).await;
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_invariants(&h).await;
    });
}
