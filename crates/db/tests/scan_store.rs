//! Integration tests for the Postgres scan store.

use chrono::{Duration, Utc};
use recon_core::scan::{ScanJob, ScanStatus};
use recon_core::store::ScanStore;
use recon_db::repositories::ScanRepo;
use recon_db::PgScanStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn queued_at(domain: &str, minutes_ago: i64) -> ScanJob {
    ScanJob::queued(
        domain.to_string(),
        Some(30),
        Utc::now() - Duration::minutes(minutes_ago),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_then_find_latest(pool: PgPool) {
    recon_db::health_check(&pool).await.unwrap();
    let store = PgScanStore::new(pool);

    let scan = queued_at("example.com", 0);
    store.create(&scan).await.unwrap();

    let found = store
        .find_latest_by_domain("example.com")
        .await
        .unwrap()
        .expect("scan should exist");
    assert_eq!(found.id, scan.id);
    assert_eq!(found.status, ScanStatus::Queued);
    assert_eq!(found.timeout_minutes, Some(30));
}

#[sqlx::test(migrations = "./migrations")]
async fn oldest_first_respects_limit(pool: PgPool) {
    let store = PgScanStore::new(pool);

    let a = queued_at("a.example.com", 30);
    let b = queued_at("b.example.com", 20);
    let c = queued_at("c.example.com", 10);
    for scan in [&c, &a, &b] {
        store.create(scan).await.unwrap();
    }

    let picked = store
        .list_by_status_oldest_first(ScanStatus::Queued, 2)
        .await
        .unwrap();
    let domains: Vec<_> = picked.iter().map(|s| s.domain.as_str()).collect();
    assert_eq!(domains, vec!["a.example.com", "b.example.com"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_persists_transition(pool: PgPool) {
    let store = PgScanStore::new(pool.clone());

    let mut scan = queued_at("example.com", 0);
    store.create(&scan).await.unwrap();

    scan.start(Utc::now()).unwrap();
    store.update(&scan).await.unwrap();

    let stored = store
        .find_by_domain_and_status("example.com", ScanStatus::InProgress)
        .await
        .unwrap()
        .expect("scan should be in progress");
    assert_eq!(stored.id, scan.id);
    assert!(stored.started_at.is_some());
    assert!(ScanRepo::list_by_status(&pool, ScanStatus::Queued)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn second_active_scan_for_domain_is_rejected(pool: PgPool) {
    let store = PgScanStore::new(pool);

    store.create(&queued_at("example.com", 5)).await.unwrap();
    let result = store.create(&queued_at("example.com", 0)).await;

    assert!(result.is_err(), "partial unique index should reject a second active scan");
}

#[sqlx::test(migrations = "./migrations")]
async fn latest_prefers_unstarted_scan_over_finished_one(pool: PgPool) {
    let store = PgScanStore::new(pool);

    let mut old = queued_at("example.com", 60);
    store.create(&old).await.unwrap();
    old.start(Utc::now() - Duration::minutes(50)).unwrap();
    old.finish(ScanStatus::Success, "found".into(), Utc::now() - Duration::minutes(40))
        .unwrap();
    store.update(&old).await.unwrap();

    let fresh = queued_at("example.com", 0);
    store.create(&fresh).await.unwrap();

    let latest = store
        .find_latest_by_domain("example.com")
        .await
        .unwrap()
        .expect("scan should exist");
    assert_eq!(latest.id, fresh.id);
    assert_eq!(latest.status, ScanStatus::Queued);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_page_is_newest_first(pool: PgPool) {
    let store = PgScanStore::new(pool);

    for (i, domain) in ["a.example.com", "b.example.com", "c.example.com"]
        .iter()
        .enumerate()
    {
        store.create(&queued_at(domain, 10 - i as i64)).await.unwrap();
    }

    let page = store.list_page(0, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].domain, "c.example.com");
    assert_eq!(page.items[1].domain, "b.example.com");
}
