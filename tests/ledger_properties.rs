//! Ledger-wide properties exercised through the public engine API

use rstest::{fixture, rstest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use split_ledger::core::{DeletionPolicy, SequentialIdGenerator};
use split_ledger::types::Allocation;
use split_ledger::{
    Group, GroupId, LedgerConfig, LedgerEngine, LedgerError, NewExpense, SplitMode, User, UserId,
};
use std::sync::Arc;

const MEMBERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn uid(id: &str) -> UserId {
    UserId::from(id)
}

fn engine_with(config: LedgerConfig) -> LedgerEngine {
    let engine = LedgerEngine::with_config(config)
        .with_id_generator(Arc::new(SequentialIdGenerator::new("exp")));
    for name in MEMBERS {
        engine
            .add_user(User::new(name, name, format!("{name}@example.com")))
            .unwrap();
    }
    engine
        .add_group(Group::new("trip", "Trip", "alice").with_members(MEMBERS))
        .unwrap();
    engine
}

#[fixture]
fn engine() -> LedgerEngine {
    engine_with(LedgerConfig::default())
}

fn trip() -> GroupId {
    GroupId::from("trip")
}

/// Sum of raw signed pair balances seen from each member
fn net_positions(engine: &LedgerEngine) -> Vec<Decimal> {
    MEMBERS
        .iter()
        .map(|me| {
            MEMBERS
                .iter()
                .filter(|other| *other != me)
                .map(|other| engine.ledger().balance(&trip(), &uid(other), &uid(me)))
                .sum()
        })
        .collect()
}

#[rstest]
fn test_pair_balances_are_antisymmetric(engine: LedgerEngine) {
    engine
        .add_expense(NewExpense::new("trip", "alice", dec!(120)))
        .unwrap();
    engine
        .add_expense(NewExpense::new("trip", "carol", dec!(47.10)))
        .unwrap();
    engine.settle(&trip(), &uid("bob"), &uid("alice"), dec!(12)).unwrap();

    for a in MEMBERS {
        for b in MEMBERS {
            let forward = engine.ledger().balance(&trip(), &uid(a), &uid(b));
            let backward = engine.ledger().balance(&trip(), &uid(b), &uid(a));
            assert_eq!(forward, -backward, "{a}/{b}");
        }
    }
}

#[rstest]
fn test_group_positions_sum_to_zero(engine: LedgerEngine) {
    let mut allocation = Allocation::new();
    allocation.insert(uid("alice"), dec!(10));
    allocation.insert(uid("bob"), dec!(60));
    allocation.insert(uid("dave"), dec!(30));

    engine
        .add_expense(NewExpense::new("trip", "bob", dec!(100)))
        .unwrap();
    engine
        .add_expense(
            NewExpense::new("trip", "dave", dec!(250)).with_split(SplitMode::Percentage, allocation),
        )
        .unwrap();
    engine.settle(&trip(), &uid("carol"), &uid("bob"), dec!(25)).unwrap();

    let positions = net_positions(&engine);
    assert_eq!(positions.iter().copied().sum::<Decimal>(), Decimal::ZERO);
}

#[rstest]
fn test_deleting_expense_restores_previous_balances(engine: LedgerEngine) {
    engine
        .add_expense(NewExpense::new("trip", "alice", dec!(40)))
        .unwrap();
    let before = engine.group_balances(&trip());

    let expense = engine
        .add_expense(NewExpense::new("trip", "bob", dec!(33.33)))
        .unwrap();
    assert_ne!(engine.group_balances(&trip()), before);

    engine.delete_expense(&expense.id).unwrap();

    assert_eq!(engine.group_balances(&trip()), before);
    assert_eq!(engine.group_expenses(&trip()).unwrap().len(), 1);
}

#[test]
fn test_record_only_deletion_keeps_balances() {
    let engine = engine_with(LedgerConfig::default().with_deletion(DeletionPolicy::RecordOnly));
    let expense = engine
        .add_expense(NewExpense::new("trip", "alice", dec!(40)))
        .unwrap();
    let before = engine.group_balances(&trip());

    engine.delete_expense(&expense.id).unwrap();

    assert_eq!(engine.group_balances(&trip()), before);
    assert!(engine.group_expenses(&trip()).unwrap().is_empty());
}

#[rstest]
fn test_rejected_expense_leaves_no_trace(engine: LedgerEngine) {
    let mut allocation = Allocation::new();
    allocation.insert(uid("alice"), dec!(5));
    allocation.insert(uid("bob"), dec!(4));

    let error = engine
        .add_expense(NewExpense::new("trip", "alice", dec!(10)).with_split(SplitMode::Exact, allocation))
        .unwrap_err();

    assert!(matches!(error, LedgerError::SplitMismatch { .. }));
    assert!(engine.group_balances(&trip()).is_empty());
    assert!(engine.group_expenses(&trip()).unwrap().is_empty());
}

#[rstest]
fn test_user_with_balances_cannot_be_deleted(engine: LedgerEngine) {
    engine
        .add_expense(NewExpense::new("trip", "alice", dec!(8)))
        .unwrap();

    assert!(matches!(
        engine.delete_user(&uid("bob")),
        Err(LedgerError::PendingBalances { .. })
    ));

    engine.settle(&trip(), &uid("bob"), &uid("alice"), dec!(2)).unwrap();
    engine.delete_user(&uid("bob")).unwrap();

    assert!(!engine.directory().is_member(&uid("bob"), &trip()));
}

#[rstest]
fn test_group_deletion_requires_settlement(engine: LedgerEngine) {
    engine
        .add_expense(NewExpense::new("trip", "alice", dec!(4)))
        .unwrap();

    assert!(matches!(
        engine.delete_group(&trip()),
        Err(LedgerError::UnsettledBalances { .. })
    ));

    for debtor in ["bob", "carol", "dave"] {
        engine.settle(&trip(), &uid(debtor), &uid("alice"), dec!(1)).unwrap();
    }
    engine.delete_group(&trip()).unwrap();

    assert!(matches!(
        engine.group_expenses(&trip()),
        Err(LedgerError::UnknownGroup { .. })
    ));
    assert!(engine.expenses().is_empty());
}

#[rstest]
fn test_user_summary_lists_every_group(engine: LedgerEngine) {
    engine
        .add_group(Group::new("flat", "Flat", "bob").with_members(["alice"]))
        .unwrap();
    engine
        .add_expense(NewExpense::new("flat", "bob", dec!(50)))
        .unwrap();
    engine
        .add_expense(NewExpense::new("trip", "alice", dec!(20)))
        .unwrap();

    let summary = engine.user_summary(&uid("alice")).unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].group, GroupId::from("flat"));
    assert_eq!(summary[0].balance.net(), dec!(-25));
    assert_eq!(summary[1].group, GroupId::from("trip"));
    assert_eq!(summary[1].balance.net(), dec!(15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_expenses_in_one_group_all_apply() {
    let engine = Arc::new(engine_with(LedgerConfig::default()));

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let payer = MEMBERS[i % MEMBERS.len()];
            tokio::spawn(async move {
                engine
                    .add_expense(NewExpense::new("trip", payer, dec!(4)))
                    .map(|_| ())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(engine.expenses().len(), 100);
    // every member paid 25 times and owes a quarter of every expense
    assert!(engine.group_balances(&trip()).is_empty());
    assert_eq!(
        net_positions(&engine).iter().copied().sum::<Decimal>(),
        Decimal::ZERO
    );
}
