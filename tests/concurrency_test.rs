mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{open_account, test_service, units};
use tellr::application::AppError;
use tellr::domain::TransactionStatus;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_cannot_overdraw() -> Result<()> {
    let (service, _temp) = test_service().await?;
    open_account(&service, "ada@example.com", units(500)).await?;

    let (first, second) = tokio::join!(
        service.withdraw("ada@example.com", units(500)),
        service.withdraw("ada@example.com", units(500)),
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientFunds { .. })))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(insufficient, 1);
    assert_eq!(service.check_balance("ada@example.com").await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_from_spawned_tasks() -> Result<()> {
    let (service, _temp) = test_service().await?;
    open_account(&service, "ada@example.com", units(2000)).await?;
    let service = Arc::new(service);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.withdraw("ada@example.com", units(500)).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(balance) => {
                assert!(balance >= 0);
                succeeded += 1;
            }
            Err(AppError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 4);
    assert_eq!(service.check_balance("ada@example.com").await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_money() -> Result<()> {
    let (service, _temp) = test_service().await?;
    open_account(&service, "amy@example.com", units(1500)).await?;
    open_account(&service, "zed@example.com", units(1000)).await?;
    let service = Arc::new(service);

    let attempts = 24;
    let handles: Vec<_> = (0..attempts)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let (from, to) = if i % 2 == 0 {
                    ("amy@example.com", "zed@example.com")
                } else {
                    ("zed@example.com", "amy@example.com")
                };
                service.transfer(from, to, units(500)).await
            })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => committed += 1,
            Err(AppError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let amy = service.check_balance("amy@example.com").await?;
    let zed = service.check_balance("zed@example.com").await?;
    assert!(amy >= 0 && zed >= 0);
    assert_eq!(amy + zed, units(2500));

    // Exactly one log entry per attempt
    let log = service.list_all_transactions().await?;
    assert_eq!(log.len(), attempts);
    let successes = log
        .iter()
        .filter(|r| r.status == TransactionStatus::Success)
        .count();
    assert_eq!(successes, committed);

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transfers_and_withdrawals_race_on_one_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    open_account(&service, "ada@example.com", units(1000)).await?;
    open_account(&service, "bob@example.com", 0).await?;
    let service = Arc::new(service);

    let transfers: Vec<_> = (0..3)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .transfer("ada@example.com", "bob@example.com", units(500))
                    .await
                    .is_ok()
            })
        })
        .collect();
    let withdrawals: Vec<_> = (0..3)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .withdraw("ada@example.com", units(500))
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut transferred = 0;
    for handle in transfers {
        if handle.await? {
            transferred += 1;
        }
    }
    let mut withdrawn = 0;
    for handle in withdrawals {
        if handle.await? {
            withdrawn += 1;
        }
    }

    // 1000 covers exactly two debits of 500, whichever kind wins
    assert_eq!(transferred + withdrawn, 2);
    assert_eq!(service.check_balance("ada@example.com").await?, 0);
    assert_eq!(
        service.check_balance("bob@example.com").await?,
        units(500) * transferred
    );

    Ok(())
}
