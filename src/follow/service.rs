use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use validator::{ValidationError, ValidationErrors};

use crate::error::{Result, ServerError};
use crate::follow::{Operation, Relationship, RepairReport, reconcile};
use crate::user::{Identity, User, UserId, UserRepository};

/// Edge designated by a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub follower: UserId,
    pub followed: UserId,
}

pub(crate) fn self_follow() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "followed_user_id",
        ValidationError::new("self_follow").with_message("Users cannot follow themselves.".into()),
    );
    errors
}

/// Follow relationships manager.
#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn UserRepository>,
}

impl FollowService {
    /// Create a new [`FollowService`].
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Make `edge.follower` follow `edge.followed`.
    pub async fn add_follower(&self, caller: &Identity, edge: Edge) -> Result<Relationship> {
        self.mutate(caller, edge, Operation::Follow).await
    }

    /// Make `edge.follower` stop following `edge.followed`.
    pub async fn remove_follower(&self, caller: &Identity, edge: Edge) -> Result<Relationship> {
        self.mutate(caller, edge, Operation::Unfollow).await
    }

    async fn mutate(
        &self,
        caller: &Identity,
        edge: Edge,
        operation: Operation,
    ) -> Result<Relationship> {
        if caller.id != edge.follower {
            tracing::warn!(
                caller = %caller.id,
                follower = %edge.follower,
                operation = operation.as_str(),
                "follow mutation on behalf of another user rejected"
            );
            record(operation, "forbidden");
            return Err(ServerError::Forbidden);
        }

        if edge.follower == edge.followed {
            record(operation, "rejected");
            return Err(self_follow().into());
        }

        // Both users must exist before anything is touched.
        let (relationship, changed) = match self
            .repo
            .update_edge(&edge.follower, &edge.followed, operation)
            .await
        {
            Ok(result) => result,
            Err(ServerError::NotFound) => {
                record(operation, "not_found");
                return Err(ServerError::NotFound);
            },
            Err(err) => {
                tracing::error!(
                    follower = %edge.follower,
                    followed = %edge.followed,
                    operation = operation.as_str(),
                    error = %err,
                    "edge could not be persisted"
                );
                record(operation, "failed");
                return Err(err);
            },
        };

        if !changed {
            tracing::debug!(
                follower = %edge.follower,
                followed = %edge.followed,
                operation = operation.as_str(),
                "edge already in requested state"
            );
            record(operation, "unchanged");
            return Ok(relationship);
        }

        tracing::info!(
            follower = %edge.follower,
            followed = %edge.followed,
            operation = operation.as_str(),
            "edge updated"
        );
        record(operation, "applied");

        Ok(relationship)
    }

    /// Run one reconciliation pass over every stored user.
    pub async fn repair(&self) -> Result<RepairReport> {
        let mut users = self.repo.list().await?;
        let report = reconcile(&mut users);

        if !report.updated.is_empty() {
            let changed: Vec<&User> = users
                .iter()
                .filter(|user| report.updated.contains(&user.id))
                .collect();
            self.repo.save_follows(&changed).await?;
        }

        tracing::info!(
            users_scanned = report.users_scanned,
            users_updated = report.updated.len(),
            edges_restored = report.edges_restored,
            duplicates_removed = report.duplicates_removed,
            dangling_removed = report.dangling_removed,
            "follow edges reconciled"
        );

        Ok(report)
    }

    /// Run [`FollowService::repair`] every `period`.
    pub fn spawn_repair(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(err) = self.repair().await {
                    tracing::error!(error = %err, "follow edges reconciliation failed");
                }
            }
        })
    }
}

fn record(operation: Operation, outcome: &'static str) {
    metrics::counter!(
        "follow_mutations_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
