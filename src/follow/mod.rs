//! Follow relationships between users.
//!
//! An edge A→B is stored twice: B's id in `A.followings` and A's id in
//! `B.followers`. Both sides must agree.

mod repair;
mod service;

pub use repair::*;
pub use service::*;

use crate::user::{User, UserId};

/// Edge mutation requested by a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Follow,
    Unfollow,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Follow => "follow",
            Operation::Unfollow => "unfollow",
        }
    }
}

/// Both ends of an edge, loaded in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub follower: User,
    pub followed: User,
}

impl Relationship {
    /// Pair two distinct users.
    pub fn new(follower: User, followed: User) -> Option<Self> {
        if follower.id == followed.id {
            return None;
        }

        Some(Self { follower, followed })
    }

    /// Whether the edge is fully present on both sides.
    pub fn exists(&self) -> bool {
        self.follower.followings.contains(&self.followed.id)
            && self.followed.followers.contains(&self.follower.id)
    }

    /// Apply `operation`. Returns `true` if any list changed.
    pub fn apply(&mut self, operation: Operation) -> bool {
        match operation {
            Operation::Follow => self.follow(),
            Operation::Unfollow => self.unfollow(),
        }
    }

    /// Add the edge. A side already holding it is left untouched.
    pub fn follow(&mut self) -> bool {
        let followings = insert_once(&mut self.follower.followings, self.followed.id);
        let followers = insert_once(&mut self.followed.followers, self.follower.id);

        followings || followers
    }

    /// Remove the edge. A side not holding it is left untouched.
    pub fn unfollow(&mut self) -> bool {
        let followings = remove_first(&mut self.follower.followings, &self.followed.id);
        let followers = remove_first(&mut self.followed.followers, &self.follower.id);

        followings || followers
    }
}

fn insert_once(ids: &mut Vec<UserId>, id: UserId) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

fn remove_first(ids: &mut Vec<UserId>, id: &UserId) -> bool {
    match ids.iter().position(|candidate| candidate == id) {
        Some(index) => {
            ids.remove(index);
            true
        },
        None => false,
    }
}
