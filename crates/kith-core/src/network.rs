//! The network domain service
//!
//! Owns the user and friendship repositories, enforces the friendship
//! lifecycle, authenticates log-in requests, and exposes the community
//! analytics entry points. Constructed explicitly and passed to its callers;
//! there is no process-wide instance.
//!
//! Every mutating operation either completes fully, including notifying
//! registered observers, or fails without leaving a partial mutation
//! behind.

use tracing::{debug, info, warn};

use crate::domain::{
    Friendship, FriendshipKey, FriendshipStatus, FriendshipView, User, UserValidator,
};
use crate::errors::{NetworkError, Result};
use crate::graph::SocialGraph;
use crate::repository::Repository;
use crate::types::{Credential, Salt, Timestamp, UserId};

// ----------------------------------------------------------------------------
// Observers
// ----------------------------------------------------------------------------

/// Handle for removing a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverCallback = Box<dyn Fn() + Send>;

// ----------------------------------------------------------------------------
// Network Service
// ----------------------------------------------------------------------------

/// The social network service
pub struct Network {
    users: Box<dyn Repository<User>>,
    friendships: Box<dyn Repository<Friendship>>,
    validator: UserValidator,
    observers: Vec<(ObserverId, ObserverCallback)>,
    next_observer_id: u64,
}

impl Network {
    /// Create a service over the given repositories
    pub fn new(
        users: Box<dyn Repository<User>>,
        friendships: Box<dyn Repository<Friendship>>,
    ) -> Self {
        Self {
            users,
            friendships,
            validator: UserValidator::new(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Observer Registration
    // ------------------------------------------------------------------------

    /// Register a callback invoked after every committed mutation. The
    /// signal carries no payload; observers re-query whatever they display.
    /// Call order across observers is unspecified.
    pub fn add_observer(&mut self, callback: impl Fn() + Send + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Remove a previously registered observer
    pub fn remove_observer(&mut self, id: ObserverId) {
        self.observers.retain(|(observer_id, _)| *observer_id != id);
    }

    fn notify_observers(&self) {
        for (_, callback) in &self.observers {
            callback();
        }
    }

    // ------------------------------------------------------------------------
    // User Lifecycle
    // ------------------------------------------------------------------------

    /// Number of registered users
    pub fn users_size(&self) -> Result<usize> {
        self.users.size()
    }

    /// All registered users
    pub fn all_users(&self) -> Result<Vec<User>> {
        self.users.get_all()
    }

    /// All friendships, in any status
    pub fn all_friendships(&self) -> Result<Vec<Friendship>> {
        self.friendships.get_all()
    }

    /// Register a user: validates the input, derives a fresh salt and the
    /// stored credential, then stores the user.
    pub fn add_user(&mut self, username: &str, password: &str, email: &str) -> Result<()> {
        self.validator
            .validate_registration(username, password, email)?;

        let salt = Salt::generate();
        let credential = Credential::derive(password, &salt);
        let user = User::new(username, credential, salt, email);

        self.users.add(user)?;
        debug!(username, "user registered");

        self.notify_observers();
        Ok(())
    }

    /// Remove a user and every friendship referencing them.
    ///
    /// The cascade is collected up front so the friendship set is not
    /// mutated while being scanned, and it is undone if a later step fails,
    /// keeping the operation all-or-nothing.
    pub fn remove_user(&mut self, username: &str) -> Result<()> {
        let user = self.resolve(username)?;

        let cascade: Vec<Friendship> = self
            .friendships
            .get_all()?
            .into_iter()
            .filter(|f| f.involves(&user))
            .collect();

        let mut removed = Vec::new();
        for friendship in &cascade {
            match self.friendships.remove(friendship) {
                Ok(()) => removed.push(friendship.clone()),
                Err(err) => {
                    self.restore_friendships(&removed);
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.users.remove(&user) {
            self.restore_friendships(&removed);
            return Err(err);
        }

        debug!(username, cascaded = removed.len(), "user removed");
        self.notify_observers();
        Ok(())
    }

    /// Best-effort restore of cascaded friendships after a failed removal
    fn restore_friendships(&mut self, friendships: &[Friendship]) {
        warn!(
            count = friendships.len(),
            "rolling back cascaded friendship deletions"
        );
        for friendship in friendships {
            let _ = self.friendships.add(friendship.clone());
        }
    }

    /// Update a user's password and/or email. Blank or absent options keep
    /// the prior value; a supplied password regenerates the credential with
    /// a fresh salt. The new snapshot is propagated into every friendship
    /// touching the user so denormalizing backends stay consistent.
    pub fn update_user(
        &mut self,
        username: &str,
        new_password: Option<&str>,
        new_email: Option<&str>,
    ) -> Result<()> {
        let current = self.resolve(username)?;

        let password = new_password.filter(|p| !p.trim().is_empty());
        let email = new_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| current.email());

        let (credential, salt) = match password {
            Some(plaintext) => {
                self.validator
                    .validate_registration(username, plaintext, email)?;
                let salt = Salt::generate();
                (Credential::derive(plaintext, &salt), salt)
            }
            None => {
                let updated = User::new(username, *current.credential(), *current.salt(), email);
                self.validator.validate(&updated)?;
                (*current.credential(), *current.salt())
            }
        };

        let updated = User::new(username, credential, salt, email);
        self.users.update(updated.clone())?;

        // Back-propagate the new snapshot into denormalized friendship
        // records. Normalized backends store foreign keys, so for them this
        // rewrites the same row.
        for mut friendship in self.friendships.get_all()? {
            if friendship.involves(&updated) {
                friendship.refresh_participant(&updated);
                self.friendships.update(friendship)?;
            }
        }

        debug!(username, "user updated");
        self.notify_observers();
        Ok(())
    }

    /// Authenticate a log-in request. Unknown usernames and wrong passwords
    /// both produce [`NetworkError::LoginRejected`], so a caller cannot
    /// probe which usernames exist.
    pub fn handle_log_in_request(&self, username: &str, password: &str) -> Result<User> {
        let user = match self.resolve(username) {
            Ok(user) => user,
            Err(NetworkError::NotFound { .. }) => {
                info!("login rejected");
                return Err(NetworkError::LoginRejected);
            }
            Err(err) => return Err(err),
        };

        if user.credential().matches(password, user.salt()) {
            Ok(user)
        } else {
            info!("login rejected");
            Err(NetworkError::LoginRejected)
        }
    }

    // ------------------------------------------------------------------------
    // Friendship Lifecycle
    // ------------------------------------------------------------------------

    /// Create a friendship between two usernames with an explicit status.
    /// Administrative entry point; the request flow is [`Network::add_friend`].
    pub fn add_friendship(
        &mut self,
        username1: &str,
        username2: &str,
        status: FriendshipStatus,
    ) -> Result<()> {
        let user1 = self.resolve(username1)?;
        let user2 = self.resolve(username2)?;

        let friendship = Friendship::new(user1, user2, Timestamp::now(), status)?;
        self.friendships.add(friendship)?;

        debug!(username1, username2, %status, "friendship added");
        self.notify_observers();
        Ok(())
    }

    /// Send a friend request: creates the edge in `Sent` status. Fails if an
    /// edge between the pair already exists in any status.
    pub fn add_friend(&mut self, user: &User, friend_username: &str) -> Result<()> {
        let friend = self.resolve(friend_username)?;

        let key = FriendshipKey::new(user.id(), friend.id());
        if self.friendships.find(&key).is_ok() {
            return Err(NetworkError::invalid_friendship(
                "already friends or a request is pending",
            ));
        }

        let friendship =
            Friendship::new(user.clone(), friend, Timestamp::now(), FriendshipStatus::Sent)?;
        self.friendships.add(friendship)?;

        debug!(from = user.username(), to = friend_username, "friend request sent");
        self.notify_observers();
        Ok(())
    }

    /// Accept a pending request from `friend_username`: the edge moves to
    /// `Accepted` and its timestamp is refreshed.
    pub fn accept_friend_request(&mut self, user: &User, friend_username: &str) -> Result<()> {
        let friend = self.resolve(friend_username)?;

        let accepted = Friendship::new(
            user.clone(),
            friend,
            Timestamp::now(),
            FriendshipStatus::Accepted,
        )?;
        self.friendships.update(accepted)?;

        debug!(by = user.username(), from = friend_username, "friend request accepted");
        self.notify_observers();
        Ok(())
    }

    /// Reject a pending request from `friend_username`: the edge is deleted
    pub fn reject_friend_request(&mut self, user: &User, friend_username: &str) -> Result<()> {
        self.delete_edge(user, friend_username)?;
        debug!(by = user.username(), from = friend_username, "friend request rejected");
        self.notify_observers();
        Ok(())
    }

    /// Unfriend: the edge is deleted
    pub fn remove_friend(&mut self, user: &User, friend_username: &str) -> Result<()> {
        self.delete_edge(user, friend_username)?;
        debug!(by = user.username(), friend = friend_username, "friend removed");
        self.notify_observers();
        Ok(())
    }

    /// Remove a friendship addressed by two usernames
    pub fn remove_friendship(&mut self, username1: &str, username2: &str) -> Result<()> {
        let user1 = self.resolve(username1)?;
        self.delete_edge(&user1, username2)?;
        debug!(username1, username2, "friendship removed");
        self.notify_observers();
        Ok(())
    }

    /// Replace a friendship's timestamp and status, addressed by usernames
    pub fn update_friendship(
        &mut self,
        username1: &str,
        username2: &str,
        since: Timestamp,
        status: FriendshipStatus,
    ) -> Result<()> {
        let user1 = self.resolve(username1)?;
        let user2 = self.resolve(username2)?;

        let friendship = Friendship::new(user1, user2, since, status)?;
        self.friendships.update(friendship)?;

        debug!(username1, username2, %status, "friendship updated");
        self.notify_observers();
        Ok(())
    }

    fn delete_edge(&mut self, user: &User, friend_username: &str) -> Result<()> {
        let friend = self.resolve(friend_username)?;
        let key = FriendshipKey::new(user.id(), friend.id());
        let existing = self.friendships.find(&key)?;
        self.friendships.remove(&existing)
    }

    // ------------------------------------------------------------------------
    // Friendship Queries
    // ------------------------------------------------------------------------

    /// Users connected to `user` through an `Accepted` friendship
    pub fn friends_of(&self, user: &User) -> Result<Vec<User>> {
        let mut friends = Vec::new();
        for friendship in self.friendships.get_all()? {
            if friendship.status() == FriendshipStatus::Accepted {
                if let Some(other) = friendship.other(user) {
                    friends.push(other.clone());
                }
            }
        }
        Ok(friends)
    }

    /// Accepted friendships on either side, plus outgoing pending requests
    pub fn friendships_of(&self, user: &User) -> Result<Vec<FriendshipView>> {
        let mut views = Vec::new();
        for friendship in self.friendships.get_all()? {
            match friendship.status() {
                FriendshipStatus::Accepted => {
                    if let Some(other) = friendship.other(user) {
                        views.push(FriendshipView::new(
                            other.username(),
                            friendship.since(),
                            friendship.status(),
                        ));
                    }
                }
                FriendshipStatus::Sent if friendship.u1() == user => {
                    views.push(FriendshipView::new(
                        friendship.u2().username(),
                        friendship.since(),
                        friendship.status(),
                    ));
                }
                _ => {}
            }
        }
        Ok(views)
    }

    /// Incoming pending requests targeting `user`
    pub fn friend_requests_for(&self, user: &User) -> Result<Vec<FriendshipView>> {
        let mut requests = Vec::new();
        for friendship in self.friendships.get_all()? {
            if friendship.status() == FriendshipStatus::Sent && friendship.u2() == user {
                requests.push(FriendshipView::new(
                    friendship.u1().username(),
                    friendship.since(),
                    friendship.status(),
                ));
            }
        }
        Ok(requests)
    }

    // ------------------------------------------------------------------------
    // Community Analytics
    // ------------------------------------------------------------------------

    /// Number of communities: connected components of the accepted-
    /// friendship graph over a fresh repository snapshot
    pub fn number_of_communities(&self) -> Result<usize> {
        Ok(self.snapshot_graph()?.community_count())
    }

    /// The community whose BFS sweep runs the most levels deep
    pub fn most_sociable_community(&self) -> Result<Vec<User>> {
        Ok(self.snapshot_graph()?.most_sociable_community())
    }

    fn snapshot_graph(&self) -> Result<SocialGraph> {
        Ok(SocialGraph::from_snapshot(
            self.users.get_all()?,
            &self.friendships.get_all()?,
        ))
    }

    // ------------------------------------------------------------------------
    // Private Helpers
    // ------------------------------------------------------------------------

    fn resolve(&self, username: &str) -> Result<User> {
        self.users.find(&UserId::from_username(username))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::repository::InMemoryRepository;

    fn memory_network() -> Network {
        Network::new(
            Box::new(InMemoryRepository::new()),
            Box::new(InMemoryRepository::new()),
        )
    }

    fn network_with_users(usernames: &[&str]) -> Network {
        let mut network = memory_network();
        for username in usernames {
            network
                .add_user(username, "password!", &format!("{username}@mail.com"))
                .unwrap();
        }
        network
    }

    #[test]
    fn test_add_user_round_trip() {
        let network = network_with_users(&["ana"]);
        let found = network.all_users().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "ana");
        assert_eq!(found[0].id(), UserId::from_username("ana"));
    }

    #[test]
    fn test_add_user_twice_fails() {
        let mut network = network_with_users(&["ana"]);
        let result = network.add_user("ana", "password!", "ana2@mail.com");
        assert!(matches!(result, Err(NetworkError::Duplicate { .. })));
    }

    #[test]
    fn test_add_user_rejects_invalid_input() {
        let mut network = memory_network();
        let result = network.add_user("", "short", "nope");
        match result {
            Err(NetworkError::Validation { messages }) => assert_eq!(messages.len(), 3),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(network.users_size().unwrap(), 0);
    }

    #[test]
    fn test_remove_missing_user() {
        let mut network = memory_network();
        let result = network.remove_user("ghost");
        assert!(matches!(result, Err(NetworkError::NotFound { .. })));
    }

    #[test]
    fn test_remove_user_cascades_friendships() {
        let mut network = network_with_users(&["ana", "bob", "carl"]);
        network
            .add_friendship("ana", "bob", FriendshipStatus::Accepted)
            .unwrap();
        network
            .add_friendship("ana", "carl", FriendshipStatus::Sent)
            .unwrap();
        network
            .add_friendship("bob", "carl", FriendshipStatus::Accepted)
            .unwrap();

        network.remove_user("ana").unwrap();

        let remaining = network.all_friendships().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].u1().username(), "bob");
        assert_eq!(remaining[0].u2().username(), "carl");
    }

    #[test]
    fn test_friend_request_lifecycle() {
        let mut network = network_with_users(&["ana", "bob"]);
        let ana = network.handle_log_in_request("ana", "password!").unwrap();
        let bob = network.handle_log_in_request("bob", "password!").unwrap();

        network.add_friend(&ana, "bob").unwrap();

        // Incoming on bob's side, outgoing on ana's.
        let requests = network.friend_requests_for(&bob).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].friend_username, "ana");
        assert_eq!(requests[0].status, FriendshipStatus::Sent);
        assert!(network.friend_requests_for(&ana).unwrap().is_empty());

        // Re-requesting in either direction fails while the edge exists.
        assert!(matches!(
            network.add_friend(&ana, "bob"),
            Err(NetworkError::InvalidFriendship { .. })
        ));
        assert!(matches!(
            network.add_friend(&bob, "ana"),
            Err(NetworkError::InvalidFriendship { .. })
        ));

        network.accept_friend_request(&bob, "ana").unwrap();

        let friends = network.friends_of(&ana).unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username(), "bob");
        assert!(network.friend_requests_for(&bob).unwrap().is_empty());

        network.remove_friend(&ana, "bob").unwrap();
        assert!(network.friends_of(&ana).unwrap().is_empty());
    }

    #[test]
    fn test_reject_friend_request_deletes_edge() {
        let mut network = network_with_users(&["ana", "bob"]);
        let ana = network.handle_log_in_request("ana", "password!").unwrap();
        let bob = network.handle_log_in_request("bob", "password!").unwrap();

        network.add_friend(&ana, "bob").unwrap();
        network.reject_friend_request(&bob, "ana").unwrap();

        assert!(network.all_friendships().unwrap().is_empty());
        // A fresh request is possible after rejection.
        network.add_friend(&ana, "bob").unwrap();
    }

    #[test]
    fn test_friendships_of_includes_outgoing_requests() {
        let mut network = network_with_users(&["ana", "bob", "carl"]);
        let ana = network.handle_log_in_request("ana", "password!").unwrap();

        network
            .add_friendship("ana", "bob", FriendshipStatus::Accepted)
            .unwrap();
        network.add_friend(&ana, "carl").unwrap();

        let views = network.friendships_of(&ana).unwrap();
        assert_eq!(views.len(), 2);
        assert!(views
            .iter()
            .any(|v| v.friend_username == "bob" && v.status == FriendshipStatus::Accepted));
        assert!(views
            .iter()
            .any(|v| v.friend_username == "carl" && v.status == FriendshipStatus::Sent));
    }

    #[test]
    fn test_login_failure_is_uniform() {
        let network = network_with_users(&["ana"]);

        let wrong_password = network.handle_log_in_request("ana", "wrong-password");
        let unknown_user = network.handle_log_in_request("ghost", "password!");

        assert!(matches!(wrong_password, Err(NetworkError::LoginRejected)));
        assert!(matches!(unknown_user, Err(NetworkError::LoginRejected)));
    }

    #[test]
    fn test_update_user_keeps_blank_fields() {
        let mut network = network_with_users(&["ana"]);
        let before = network.handle_log_in_request("ana", "password!").unwrap();

        network.update_user("ana", None, Some("new@mail.com")).unwrap();

        let after = network.handle_log_in_request("ana", "password!").unwrap();
        assert_eq!(after.email(), "new@mail.com");
        // Credential and salt untouched when no password is supplied.
        assert_eq!(after.credential(), before.credential());
        assert_eq!(after.salt(), before.salt());
    }

    #[test]
    fn test_update_user_regenerates_salt_with_new_password() {
        let mut network = network_with_users(&["ana"]);
        let before = network.handle_log_in_request("ana", "password!").unwrap();

        network
            .update_user("ana", Some("otherpassword"), None)
            .unwrap();

        assert!(matches!(
            network.handle_log_in_request("ana", "password!"),
            Err(NetworkError::LoginRejected)
        ));
        let after = network
            .handle_log_in_request("ana", "otherpassword")
            .unwrap();
        assert_ne!(after.salt(), before.salt());
        assert_eq!(after.email(), before.email());
    }

    #[test]
    fn test_update_user_propagates_into_friendships() {
        let mut network = network_with_users(&["ana", "bob"]);
        network
            .add_friendship("ana", "bob", FriendshipStatus::Accepted)
            .unwrap();

        network.update_user("ana", None, Some("new@mail.com")).unwrap();

        let friendships = network.all_friendships().unwrap();
        let ana_side = if friendships[0].u1().username() == "ana" {
            friendships[0].u1()
        } else {
            friendships[0].u2()
        };
        assert_eq!(ana_side.email(), "new@mail.com");
    }

    #[test]
    fn test_observers_notified_after_each_mutation() {
        let mut network = memory_network();
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        let id = network.add_observer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        network.add_user("ana", "password!", "ana@mail.com").unwrap();
        network.add_user("bob", "password!", "bob@mail.com").unwrap();
        assert_eq!(notifications.load(Ordering::SeqCst), 2);

        // Failed mutations do not notify.
        let _ = network.add_user("ana", "password!", "ana@mail.com");
        assert_eq!(notifications.load(Ordering::SeqCst), 2);

        network.remove_observer(id);
        network.remove_user("ana").unwrap();
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_community_analytics_over_snapshot() {
        let mut network = network_with_users(&["u1", "u2", "u3", "u4"]);
        network
            .add_friendship("u1", "u2", FriendshipStatus::Accepted)
            .unwrap();
        network
            .add_friendship("u2", "u3", FriendshipStatus::Accepted)
            .unwrap();

        assert_eq!(network.number_of_communities().unwrap(), 2);
        let community = network.most_sociable_community().unwrap();
        let names: Vec<&str> = community.iter().map(|u| u.username()).collect();
        assert_eq!(names, vec!["u1", "u2", "u3"]);
    }
}
