//! End-to-end tests for the balance aggregation pipeline

use std::sync::Arc;

use chrono::Utc;
use keystream_processor::{
    Codec, FaultPolicy, JsonCodec, PartitionedSource, ProcessorConfig, StreamExecutor,
    TopologyDriver,
};
use keystream_topologies::balance::{
    self, BANK_BALANCES, BANK_TRANSACTIONS, REJECTED_TRANSACTIONS,
};
use keystream_topologies::BalanceQueryService;
use keystream_types::{BankBalance, BankTransaction, TransactionStatus};

fn key_codec() -> JsonCodec<u64> {
    JsonCodec::new()
}

fn tx_codec() -> JsonCodec<BankTransaction> {
    JsonCodec::new()
}

fn balance_codec() -> JsonCodec<BankBalance> {
    JsonCodec::new()
}

fn tx(id: u64, amount: i64) -> BankTransaction {
    BankTransaction::requested(id, amount, Utc::now())
}

fn driver() -> TopologyDriver {
    TopologyDriver::new(balance::topology().unwrap(), 4)
}

async fn pipe(driver: &TopologyDriver, account: u64, transaction: BankTransaction) {
    driver
        .pipe_as(
            BANK_TRANSACTIONS,
            &account,
            &transaction,
            &key_codec(),
            &tx_codec(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_credit_then_covered_debit() {
    let driver = driver();
    pipe(&driver, 1, tx(1, 100)).await;
    pipe(&driver, 1, tx(2, -30)).await;

    let service = BalanceQueryService::new(&driver).unwrap();
    let balance = service.balance(1).await.unwrap().unwrap();
    assert_eq!(balance.total, 70);
    assert_eq!(
        balance.latest_transaction.unwrap().status,
        TransactionStatus::Approved
    );

    // One balance update published per transaction, in order.
    let updates = driver
        .sinks()
        .drain_as(BANK_BALANCES, &key_codec(), &balance_codec())
        .unwrap();
    let totals: Vec<i64> = updates.iter().map(|(_, b)| b.total).collect();
    assert_eq!(totals, vec![100, 70]);

    assert!(driver.sinks().is_empty(REJECTED_TRANSACTIONS));
}

#[tokio::test]
async fn test_uncovered_debit_routed_to_rejected() {
    let driver = driver();
    pipe(&driver, 1, tx(1, 50)).await;
    pipe(&driver, 1, tx(2, -80)).await;

    let service = BalanceQueryService::new(&driver).unwrap();
    let balance = service.balance(1).await.unwrap().unwrap();
    // The rejected debit never touches the total.
    assert_eq!(balance.total, 50);

    let rejected = driver
        .sinks()
        .drain_as(REJECTED_TRANSACTIONS, &key_codec(), &tx_codec())
        .unwrap();
    assert_eq!(rejected.len(), 1);
    let (account, transaction) = &rejected[0];
    assert_eq!(*account, 1);
    assert_eq!(transaction.id, 2);
    assert_eq!(transaction.status, TransactionStatus::Rejected);
}

#[tokio::test]
async fn test_presettled_rejection_reaches_rejected_sink() {
    let driver = driver();
    let mut presettled = tx(3, 25);
    presettled.status = TransactionStatus::Rejected;

    pipe(&driver, 2, tx(1, 10)).await;
    pipe(&driver, 2, presettled).await;

    // The rejected transaction itself is published, not the aggregate.
    let rejected = driver
        .sinks()
        .drain_as(REJECTED_TRANSACTIONS, &key_codec(), &tx_codec())
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].1.id, 3);

    let service = BalanceQueryService::new(&driver).unwrap();
    assert_eq!(service.balance(2).await.unwrap().unwrap().total, 10);
}

#[tokio::test]
async fn test_replay_yields_identical_balances() {
    let sequence = vec![
        (1u64, tx(1, 100)),
        (2, tx(2, 40)),
        (1, tx(3, -30)),
        (1, tx(4, -200)),
        (2, tx(5, -40)),
    ];

    let mut finals = Vec::new();
    for _ in 0..2 {
        let driver = driver();
        for (account, transaction) in &sequence {
            pipe(&driver, *account, transaction.clone()).await;
        }
        let service = BalanceQueryService::new(&driver).unwrap();
        finals.push((
            service.balance(1).await.unwrap(),
            service.balance(2).await.unwrap(),
        ));
    }

    assert_eq!(finals[0], finals[1]);
    assert_eq!(finals[0].0.as_ref().unwrap().total, 70);
    assert_eq!(finals[0].1.as_ref().unwrap().total, 0);
}

#[tokio::test]
async fn test_per_key_updates_arrive_in_order() {
    let driver = driver();
    for i in 1..=20 {
        pipe(&driver, 9, tx(i, 1)).await;
    }

    let updates = driver
        .sinks()
        .drain_as(BANK_BALANCES, &key_codec(), &balance_codec())
        .unwrap();
    let totals: Vec<i64> = updates.iter().map(|(_, b)| b.total).collect();
    assert_eq!(totals, (1..=20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_unknown_account_is_none() {
    let driver = driver();
    let service = BalanceQueryService::new(&driver).unwrap();
    assert_eq!(service.balance(404).await.unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_accounts_through_executor() {
    let config = ProcessorConfig {
        partitions: 4,
        buffer_size: 256,
        fault_policy: FaultPolicy::FailPartition,
    };
    let driver = Arc::new(TopologyDriver::new(balance::topology().unwrap(), 4));
    let mut executor = StreamExecutor::new(Arc::clone(&driver), &config).unwrap();

    let source = PartitionedSource::new(BANK_TRANSACTIONS, 4, 256);
    executor.attach(&source).unwrap();

    let kc = key_codec();
    let vc = tx_codec();
    for account in 0..8u64 {
        for i in 0..5 {
            source
                .send(
                    kc.encode(&account).unwrap(),
                    vc.encode(&tx(account * 10 + i, 10)).unwrap(),
                )
                .await
                .unwrap();
        }
    }

    // 8 accounts x 5 transactions, one balance update each.
    for _ in 0..200 {
        if driver.sinks().len(BANK_BALANCES) == 40 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    executor.shutdown().await;
    assert_eq!(driver.sinks().len(BANK_BALANCES), 40);

    let service = BalanceQueryService::new(&driver).unwrap();
    for account in 0..8u64 {
        let balance = service.balance(account).await.unwrap().unwrap();
        assert_eq!(balance.total, 50);
    }
}
