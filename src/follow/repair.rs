//! Reconciliation of follow edges.
//!
//! Rebuilds both lists of every user from the union of what either side
//! records. Used to heal edges written by older data or lost updates.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::user::{User, UserId};

/// Summary of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RepairReport {
    pub users_scanned: usize,
    /// Missing sides added back.
    pub edges_restored: usize,
    pub duplicates_removed: usize,
    /// Self references and ids of unknown users.
    pub dangling_removed: usize,
    /// Users whose lists changed.
    pub updated: Vec<UserId>,
}

/// Restore the symmetry of every edge among `users`, in place.
///
/// An edge recorded on either side is kept on both. Existing order is
/// preserved and restored entries are appended.
pub fn reconcile(users: &mut [User]) -> RepairReport {
    let known: HashSet<UserId> = users.iter().map(|user| user.id).collect();
    let mut followings_of: HashMap<UserId, BTreeSet<UserId>> = HashMap::new();
    let mut followers_of: HashMap<UserId, BTreeSet<UserId>> = HashMap::new();

    let edges = users.iter().flat_map(|user| {
        let outgoing = user.followings.iter().map(move |followed| (user.id, *followed));
        let incoming = user.followers.iter().map(move |follower| (*follower, user.id));
        outgoing.chain(incoming)
    });
    for (follower, followed) in edges {
        if follower != followed && known.contains(&follower) && known.contains(&followed) {
            followings_of.entry(follower).or_default().insert(followed);
            followers_of.entry(followed).or_default().insert(follower);
        }
    }

    let mut report = RepairReport {
        users_scanned: users.len(),
        ..Default::default()
    };
    let empty = BTreeSet::new();

    for user in users.iter_mut() {
        let followings = rebuild(
            &user.followings,
            followings_of.get(&user.id).unwrap_or(&empty),
            &mut report,
        );
        let followers = rebuild(
            &user.followers,
            followers_of.get(&user.id).unwrap_or(&empty),
            &mut report,
        );

        if followings != user.followings || followers != user.followers {
            user.followings = followings;
            user.followers = followers;
            report.updated.push(user.id);
        }
    }

    report
}

fn rebuild(current: &[UserId], desired: &BTreeSet<UserId>, report: &mut RepairReport) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(current.len());
    let mut list = Vec::with_capacity(desired.len());

    for id in current {
        if !desired.contains(id) {
            report.dangling_removed += 1;
        } else if !seen.insert(*id) {
            report.duplicates_removed += 1;
        } else {
            list.push(*id);
        }
    }

    for id in desired {
        if seen.insert(*id) {
            list.push(*id);
            report.edges_restored += 1;
        }
    }

    list
}
