use be_engine::{ConfigError, Failure, JobError, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl CliError {
    /// Process exit status: 1 transport/decode, 2 usage, 3 auth, 130 cancelled.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            CliError::Session(e) => match e.failure() {
                Failure::Usage => 2,
                Failure::Auth => 3,
                Failure::Transport | Failure::Decode => 1,
                Failure::Cancelled => 130,
            },
            CliError::Job(JobError::NoTargets | JobError::InvalidTargets(_)) => 2,
            CliError::Job(JobError::Unauthorized) => 3,
            CliError::Job(_) => 1,
        }
    }

    /// Errors after which the subcommand usage is worth showing.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            CliError::Config(ConfigError::MissingToken)
                | CliError::Session(SessionError::MissingToken)
                | CliError::Job(JobError::NoTargets | JobError::InvalidTargets(_))
        )
    }
}
