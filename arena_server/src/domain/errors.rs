// Domain-level errors for account workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStoreError {
    InvalidUsername,
    InvalidPassword,
    UsernameTaken,
    InvalidCredentials,
    NotFound,
    StorageFailure,
}

impl UserStoreError {
    /// Message shown to the player.
    pub fn message(self) -> &'static str {
        match self {
            UserStoreError::InvalidUsername => {
                "Username must be 3-20 characters of letters, digits or underscores"
            }
            UserStoreError::InvalidPassword => "Password must be at least 6 characters",
            UserStoreError::UsernameTaken => "Username already exists",
            UserStoreError::InvalidCredentials => "Invalid username or password",
            UserStoreError::NotFound => "User not found",
            UserStoreError::StorageFailure => "User storage unavailable",
        }
    }
}
