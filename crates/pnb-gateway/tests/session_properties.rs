//! Session lifecycle, address cap and quota behaviour driven through
//! `SessionManager` with a controllable clock

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use pnb_core::{ClientAddress, ManualClock, Operation, RandomTokenSource, SessionError};
use pnb_gateway::session::{ReapReport, SessionManager, SessionPolicy};

fn setup(policy: SessionPolicy) -> (Arc<ManualClock>, Arc<SessionManager>) {
    let clock = Arc::new(ManualClock::starting_now());
    let manager = Arc::new(SessionManager::with_sources(
        policy,
        clock.clone(),
        Arc::new(RandomTokenSource),
    ));
    (clock, manager)
}

fn addr(s: &str) -> ClientAddress {
    ClientAddress::new(s)
}

#[test]
fn tokens_are_unique() {
    let policy = SessionPolicy {
        max_sessions_per_address: 1,
        ..SessionPolicy::default()
    };
    let (_, manager) = setup(policy);

    let mut seen = HashSet::new();
    for i in 0..500 {
        let session = manager
            .create_session(addr(&format!("10.0.{}.{}", i / 256, i % 256)))
            .unwrap();
        assert_eq!(session.token.as_str().len(), 64);
        assert!(seen.insert(session.token.clone()), "duplicate token issued");
    }
}

#[test]
fn ttl_boundary() {
    let (clock, manager) = setup(SessionPolicy::default());
    let session = manager.create_session(addr("1.2.3.4")).unwrap();
    let token = session.token.clone();

    clock.set(session.expires_at - chrono::Duration::milliseconds(1));
    assert!(manager.validate(&token).is_ok());

    clock.set(session.expires_at);
    assert!(manager.validate(&token).is_ok());

    clock.set(session.expires_at + chrono::Duration::milliseconds(1));
    assert_eq!(manager.validate(&token).unwrap_err(), SessionError::Expired);
    assert_eq!(manager.validate(&token).unwrap_err(), SessionError::NotFound);
}

#[test]
fn address_cap_frees_after_reap() {
    let (clock, manager) = setup(SessionPolicy::default());
    let a = addr("1.2.3.4");

    let first = manager.create_session(a.clone()).unwrap();
    clock.advance(Duration::from_secs(600));
    manager.create_session(a.clone()).unwrap();
    manager.create_session(a.clone()).unwrap();

    assert_eq!(
        manager.create_session(a.clone()).unwrap_err(),
        SessionError::AddressQuotaExceeded {
            address: a.clone(),
            max: 3
        }
    );
    // Other addresses are unaffected
    assert!(manager.create_session(addr("5.6.7.8")).is_ok());

    // Only the first session has expired
    clock.set(first.expires_at + chrono::Duration::seconds(1));
    let report = manager.reap_expired();
    assert_eq!(report.removed, 1);
    assert_eq!(manager.live_sessions_for(&a), 2);

    assert!(manager.create_session(a.clone()).is_ok());
    assert!(manager.create_session(a).is_err());
}

#[test]
fn rate_limit_window_resets() {
    let policy = SessionPolicy {
        ttl: chrono::Duration::hours(3),
        ..SessionPolicy::default()
    };
    let (clock, manager) = setup(policy);
    let token = manager.create_session(addr("1.2.3.4")).unwrap().token.clone();

    for _ in 0..50 {
        manager
            .authenticate_and_authorize(&token, Operation::ValidateChallenge, 50)
            .unwrap();
    }
    assert_eq!(
        manager
            .authenticate_and_authorize(&token, Operation::ValidateChallenge, 50)
            .unwrap_err(),
        SessionError::RateLimited(Operation::ValidateChallenge)
    );

    clock.advance(Duration::from_secs(3600));
    let session = manager
        .authenticate_and_authorize(&token, Operation::ValidateChallenge, 50)
        .unwrap();
    assert_eq!(session.quota_snapshot().count(Operation::ValidateChallenge), 1);
}

#[test]
fn concurrent_requests_at_limit_admit_one() {
    const THREADS: usize = 16;
    let (_, manager) = setup(SessionPolicy::default());
    let token = manager.create_session(addr("1.2.3.4")).unwrap().token.clone();

    for _ in 0..49 {
        manager
            .authenticate_and_authorize(&token, Operation::GenerateScene, 50)
            .unwrap();
    }

    let barrier = Barrier::new(THREADS);
    let admitted = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    manager
                        .authenticate_and_authorize(&token, Operation::GenerateScene, 50)
                        .is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(admitted, 1);
    let session = manager.validate(&token).unwrap();
    assert_eq!(session.quota_snapshot().count(Operation::GenerateScene), 50);
}

#[test]
fn concurrent_creates_respect_address_cap() {
    const THREADS: usize = 16;
    let (_, manager) = setup(SessionPolicy::default());
    let a = addr("1.2.3.4");

    let barrier = Barrier::new(THREADS);
    let created = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    manager.create_session(a.clone()).is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(created, 3);
    assert_eq!(manager.live_sessions_for(&a), 3);
    assert_eq!(manager.stats().active_sessions, 3);
}

#[test]
fn reaped_sessions_leave_no_trace() {
    let (clock, manager) = setup(SessionPolicy::default());
    let tokens: Vec<_> = ["1.1.1.1", "1.1.1.1", "2.2.2.2"]
        .into_iter()
        .map(|a| manager.create_session(addr(a)).unwrap().token.clone())
        .collect();

    clock.advance(Duration::from_secs(3601));
    assert_eq!(
        manager.reap_expired(),
        ReapReport {
            expired: 3,
            removed: 3,
            failures: 0
        }
    );

    for token in &tokens {
        assert!(!manager.contains(token));
    }
    let stats = manager.stats();
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.tracked_addresses, 0);

    // A second sweep finds nothing
    assert_eq!(manager.reap_expired(), ReapReport::default());
}

#[test]
fn end_to_end_quota_recovery() {
    let policy = SessionPolicy {
        ttl: chrono::Duration::hours(2),
        ..SessionPolicy::default()
    };
    let (clock, manager) = setup(policy);
    let t1 = manager.create_session(addr("1.2.3.4")).unwrap().token.clone();

    for _ in 0..50 {
        assert!(manager
            .authenticate_and_authorize(&t1, Operation::GenerateScene, 50)
            .is_ok());
    }
    assert_eq!(
        manager
            .authenticate_and_authorize(&t1, Operation::GenerateScene, 50)
            .unwrap_err(),
        SessionError::RateLimited(Operation::GenerateScene)
    );

    clock.advance(Duration::from_secs(65 * 60));
    let session = manager
        .authenticate_and_authorize(&t1, Operation::GenerateScene, 50)
        .unwrap();
    assert_eq!(session.quota_snapshot().count(Operation::GenerateScene), 1);
}

#[test]
fn expired_session_rejected_before_quota() {
    let (clock, manager) = setup(SessionPolicy::default());
    let token = manager.create_session(addr("1.2.3.4")).unwrap().token.clone();

    clock.advance(Duration::from_secs(65 * 60));
    assert_eq!(
        manager
            .authenticate_and_authorize(&token, Operation::GenerateScene, 50)
            .unwrap_err(),
        SessionError::Expired
    );
    assert_eq!(manager.live_sessions_for(&addr("1.2.3.4")), 0);
}
