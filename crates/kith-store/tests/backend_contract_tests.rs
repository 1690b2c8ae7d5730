//! Backend Contract Parity Tests
//!
//! Every persistence backend (in-memory, file and SQLite) must satisfy
//! the repository contract with identical success/failure behavior, so
//! swapping backends never changes what the network service observes. Each
//! test here runs the same assertions against all three.

use tempfile::TempDir;

use kith_core::{
    Credential, Friendship, FriendshipKey, FriendshipStatus, NetworkError, Repository, Salt,
    Timestamp, User, UserId,
};
use kith_store::{build_repositories, RepositoryPair, StoreConfig};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

/// A fresh repository pair per backend, plus the directory guard that keeps
/// file-backed storage alive for the duration of the test
fn all_backends() -> Vec<(&'static str, RepositoryPair, Option<TempDir>)> {
    let memory = build_repositories(&StoreConfig::Memory).unwrap();

    let file_dir = TempDir::new().unwrap();
    let file = build_repositories(&StoreConfig::File {
        users_path: file_dir.path().join("users.txt"),
        friendships_path: file_dir.path().join("friendships.txt"),
    })
    .unwrap();

    let sqlite_dir = TempDir::new().unwrap();
    let sqlite = build_repositories(&StoreConfig::Sqlite {
        path: sqlite_dir.path().join("kith.db"),
    })
    .unwrap();

    vec![
        ("memory", memory, None),
        ("file", file, Some(file_dir)),
        ("sqlite", sqlite, Some(sqlite_dir)),
    ]
}

fn user(username: &str) -> User {
    let salt = Salt::new([1u8; 8]);
    User::new(
        username,
        Credential::derive("password!", &salt),
        salt,
        format!("{username}@mail.com"),
    )
}

fn user_with_email(username: &str, email: &str) -> User {
    let salt = Salt::new([1u8; 8]);
    User::new(username, Credential::derive("password!", &salt), salt, email)
}

fn friendship(a: &User, b: &User, millis: u64, status: FriendshipStatus) -> Friendship {
    Friendship::new(a.clone(), b.clone(), Timestamp::new(millis), status).unwrap()
}

// ----------------------------------------------------------------------------
// User Contract
// ----------------------------------------------------------------------------

#[test]
fn empty_repository_behavior_matches() {
    for (name, (users, friendships), _guard) in all_backends() {
        assert_eq!(users.size().unwrap(), 0, "backend {name}");
        assert!(users.get_all().unwrap().is_empty(), "backend {name}");
        assert!(
            matches!(
                users.find(&UserId::from_username("ghost")),
                Err(NetworkError::NotFound { .. })
            ),
            "backend {name}"
        );
        assert_eq!(friendships.size().unwrap(), 0, "backend {name}");
    }
}

#[test]
fn add_then_find_round_trips() {
    for (name, (mut users, _), _guard) in all_backends() {
        let ana = user("ana");
        users.add(ana.clone()).unwrap();

        let found = users.find(&ana.id()).unwrap();
        assert_eq!(found.username(), "ana", "backend {name}");
        assert_eq!(found.email(), "ana@mail.com", "backend {name}");
        assert_eq!(found.credential(), ana.credential(), "backend {name}");
        assert_eq!(found.salt(), ana.salt(), "backend {name}");
    }
}

#[test]
fn duplicate_username_and_duplicate_email_both_collide() {
    for (name, (mut users, _), _guard) in all_backends() {
        users.add(user("ana")).unwrap();

        let same_username = user_with_email("ana", "different@mail.com");
        assert!(
            matches!(users.add(same_username), Err(NetworkError::Duplicate { .. })),
            "backend {name}: username collision"
        );

        let same_email = user_with_email("bob", "ana@mail.com");
        assert!(
            matches!(users.add(same_email), Err(NetworkError::Duplicate { .. })),
            "backend {name}: email collision"
        );

        assert_eq!(users.size().unwrap(), 1, "backend {name}");
    }
}

#[test]
fn remove_and_update_require_an_existing_entity() {
    for (name, (mut users, _), _guard) in all_backends() {
        assert!(
            matches!(users.remove(&user("ghost")), Err(NetworkError::NotFound { .. })),
            "backend {name}"
        );
        assert!(
            matches!(users.update(user("ghost")), Err(NetworkError::NotFound { .. })),
            "backend {name}"
        );

        users.add(user("ana")).unwrap();
        users.remove(&user("ana")).unwrap();
        assert_eq!(users.size().unwrap(), 0, "backend {name}");
    }
}

#[test]
fn get_all_order_is_stable_across_updates() {
    for (name, (mut users, _), _guard) in all_backends() {
        for username in ["carl", "ana", "bob"] {
            users.add(user(username)).unwrap();
        }
        users
            .update(user_with_email("ana", "ana@mail.com"))
            .unwrap();

        let order: Vec<String> = users
            .get_all()
            .unwrap()
            .iter()
            .map(|u| u.username().to_string())
            .collect();
        assert_eq!(order, vec!["carl", "ana", "bob"], "backend {name}");
    }
}

// ----------------------------------------------------------------------------
// Friendship Contract
// ----------------------------------------------------------------------------

#[test]
fn friendship_identity_ignores_argument_order() {
    for (name, (mut users, mut friendships), _guard) in all_backends() {
        let ana = user("ana");
        let bob = user("bob");
        users.add(ana.clone()).unwrap();
        users.add(bob.clone()).unwrap();

        friendships
            .add(friendship(&ana, &bob, 10, FriendshipStatus::Sent))
            .unwrap();

        // find, update and remove all resolve through the reversed pair.
        let reversed_key = FriendshipKey::new(bob.id(), ana.id());
        let found = friendships.find(&reversed_key).unwrap();
        assert_eq!(found.status(), FriendshipStatus::Sent, "backend {name}");

        let reversed = friendship(&bob, &ana, 99, FriendshipStatus::Accepted);
        assert!(
            matches!(
                friendships.add(reversed.clone()),
                Err(NetworkError::Duplicate { .. })
            ),
            "backend {name}: reversed add must collide"
        );

        friendships.update(reversed.clone()).unwrap();
        let found = friendships.find(&reversed_key).unwrap();
        assert_eq!(found.status(), FriendshipStatus::Accepted, "backend {name}");
        assert_eq!(found.since().as_millis(), 99, "backend {name}");

        friendships.remove(&reversed).unwrap();
        assert_eq!(friendships.size().unwrap(), 0, "backend {name}");
    }
}

#[test]
fn friendship_survives_a_fresh_snapshot_read() {
    for (name, (mut users, mut friendships), _guard) in all_backends() {
        let ana = user("ana");
        let bob = user("bob");
        users.add(ana.clone()).unwrap();
        users.add(bob.clone()).unwrap();
        friendships
            .add(friendship(&ana, &bob, 42, FriendshipStatus::Accepted))
            .unwrap();

        let all = friendships.get_all().unwrap();
        assert_eq!(all.len(), 1, "backend {name}");
        assert_eq!(all[0].u1().username(), "ana", "backend {name}");
        assert_eq!(all[0].u2().username(), "bob", "backend {name}");
        assert_eq!(all[0].since().as_millis(), 42, "backend {name}");
    }
}
