//! Community analysis over the friendship graph
//!
//! Maps a user/friendship snapshot onto an undirected graph: users are
//! vertices and accepted friendships are edges. Communities are the
//! connected components; the "most sociable" community is the one whose
//! breadth-first sweep runs the most levels deep.

use std::collections::VecDeque;

use crate::domain::{Friendship, FriendshipStatus, User};

/// Undirected adjacency snapshot of the accepted-friendship relation.
///
/// Vertex order follows the user snapshot order, which makes the
/// first-found tie-break of [`SocialGraph::most_sociable_community`]
/// deterministic for a given repository state.
#[derive(Debug, Clone)]
pub struct SocialGraph {
    users: Vec<User>,
    adjacency: Vec<Vec<u8>>,
}

impl SocialGraph {
    /// Build the graph from a repository snapshot. Only `Accepted`
    /// friendships produce edges; pending requests do not connect anyone.
    pub fn from_snapshot(users: Vec<User>, friendships: &[Friendship]) -> Self {
        let vertex_count = users.len();
        let mut adjacency = vec![vec![0u8; vertex_count]; vertex_count];
        for friendship in friendships
            .iter()
            .filter(|f| f.status() == FriendshipStatus::Accepted)
        {
            let i = users.iter().position(|u| u == friendship.u1());
            let j = users.iter().position(|u| u == friendship.u2());
            if let (Some(i), Some(j)) = (i, j) {
                if i != j {
                    adjacency[i][j] = 1;
                    adjacency[j][i] = 1;
                }
            }
        }
        Self { users, adjacency }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.users.len()
    }

    /// Number of communities: connected components of the graph, counting
    /// isolated users as singleton communities. Zero users means zero
    /// communities.
    pub fn community_count(&self) -> usize {
        let vertex_count = self.vertex_count();
        let mut visited = vec![false; vertex_count];

        let mut communities = 0;
        for vertex in 0..vertex_count {
            if !visited[vertex] {
                self.dfs(&mut visited, vertex);
                communities += 1;
            }
        }
        communities
    }

    /// The community whose BFS sweep runs the most levels deep.
    ///
    /// For every component, a sweep is started from each vertex that has not
    /// yet been a starting point. A strictly longer sweep replaces the
    /// current winner, so ties keep the first sweep found in vertex order.
    /// The returned users are the winning sweep's visited set. If every
    /// sweep has length zero (no accepted edges at all) the result is empty.
    pub fn most_sociable_community(&self) -> Vec<User> {
        let vertex_count = self.vertex_count();
        let mut visited = vec![false; vertex_count];
        let mut started_from = vec![false; vertex_count];

        let mut best = Vec::new();
        let mut max_length = 0;
        for vertex in 0..vertex_count {
            if visited[vertex] {
                continue;
            }
            // Exhaust one component.
            self.dfs(&mut visited, vertex);

            // Sweep it from every vertex that has not started a BFS yet.
            for start in 0..vertex_count {
                if visited[start] && !started_from[start] {
                    started_from[start] = true;

                    let mut swept = vec![false; vertex_count];
                    let length = self.bfs_sweep(&mut swept, start);

                    if length > max_length {
                        max_length = length;
                        best = (0..vertex_count)
                            .filter(|&v| swept[v])
                            .map(|v| self.users[v].clone())
                            .collect();
                    }
                }
            }
        }
        best
    }

    /// Depth-first search marking every vertex reachable from `start`
    fn dfs(&self, visited: &mut [bool], start: usize) {
        visited[start] = true;
        for next in 0..self.vertex_count() {
            if self.adjacency[start][next] > 0 && !visited[next] {
                self.dfs(visited, next);
            }
        }
    }

    /// Breadth-first sweep from `start`, returning its level count.
    ///
    /// Vertices are marked visited when dequeued, not when enqueued, and the
    /// count increments once per dequeued vertex that still has an unvisited
    /// neighbor. The result is the number of levels a single sweep descends,
    /// not a graph diameter: a three-vertex chain scores 2, a six-vertex
    /// star scores 1 from its hub.
    fn bfs_sweep(&self, visited: &mut [bool], start: usize) -> usize {
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);
        let mut length = 0;

        while let Some(current) = queue.pop_front() {
            visited[current] = true;

            let mut found = false;
            for next in 0..self.vertex_count() {
                if self.adjacency[current][next] > 0 && !visited[next] {
                    found = true;
                    queue.push_back(next);
                }
            }

            if found {
                length += 1;
            }
        }

        length
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
