//! Concurrent writers against the in-memory store.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;

use domain::{GroupId, SessionSettings, VoteValue, VotingSession};
use store::{InMemoryStore, SessionStore, StoreError};

fn candidates() -> Vec<domain::MovieCandidate> {
    (1..=3)
        .map(|id| domain::MovieCandidate {
            movie_id: id,
            title: format!("Movie {}", id),
            year: None,
            genres: Vec::new(),
            poster_url: None,
            rating: 7.0,
            score: 10.0,
            reason: String::new(),
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_leave_one_open_session() {
    let store = Arc::new(InMemoryStore::new());
    let group_id = GroupId::new_v4();

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let session = VotingSession::new(
                group_id,
                "owner",
                candidates(),
                SessionSettings::default(),
                Utc::now(),
            );
            store.insert_session(session).await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::OpenSessionExists(_))))
        .count();
    assert_eq!(created, 1);
    assert_eq!(rejected, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retrying_writers_lose_no_votes() {
    let store = Arc::new(InMemoryStore::new());
    let mut session = VotingSession::new(
        GroupId::new_v4(),
        "owner",
        candidates(),
        SessionSettings::default(),
        Utc::now(),
    );
    session.start("owner", Utc::now()).unwrap();
    let session = store.insert_session(session).await.unwrap();
    let session_id = session.id;

    let voters = (0..20).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let user = format!("user-{}", i);
            loop {
                let mut current = store.get_session(session_id).await.unwrap().unwrap();
                current
                    .cast_vote(&user, (i % 3) + 1, VoteValue::Yes, Utc::now())
                    .unwrap();
                match store.replace_session(current).await {
                    Ok(_) => break,
                    Err(e) if e.is_conflict() => continue,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        })
    });
    for handle in join_all(voters).await {
        handle.unwrap();
    }

    let stored = store.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(stored.votes.len(), 20);
    assert_eq!(stored.version, 20);
}
