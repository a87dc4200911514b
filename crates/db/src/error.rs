use taskwatch_core::error::CoreError;

/// Failure of a transactional repository method that also enforces a
/// domain rule on the locked rows.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
