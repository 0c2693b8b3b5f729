use provenance_rules::RuleError;
use provenance_store::{RepositoryError, StoreError};

/// Errors from closure computation and deletion.
#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("graph read failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to delete {count} node(s) from the store, no rows were removed: {source}")]
    StoreDeletion { count: usize, source: StoreError },

    #[error("failed to locate node artifacts before deletion: {0}")]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_errors_pass_through_unchanged() {
        let err: DeleteError = RuleError::UnknownRule {
            names: vec!["sideways".into()],
        }
        .into();
        assert!(err.to_string().starts_with("unknown traversal rule(s): sideways"));
    }

    #[test]
    fn store_deletion_display() {
        let err = DeleteError::StoreDeletion {
            count: 3,
            source: StoreError::Backend("deadlock detected".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 node(s)"));
        assert!(msg.contains("deadlock detected"));
    }
}
