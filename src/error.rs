use thiserror::Error;

/// Failure of a single external command invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("authentication failed or cancelled")]
    AuthFailed,
    #[error("command exited with {}: {}", describe_exit(.exit_code), .stderr.trim())]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PortsError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to get port information. {}", describe_attempts(.attempts))]
    SourcesExhausted { attempts: Vec<(String, CommandError)> },
    #[error("A refresh is already in progress")]
    RefreshInProgress,
    #[error("Invalid PID: {0}")]
    InvalidPid(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortsError>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (killed by signal)".to_string(),
    }
}

fn describe_attempts(attempts: &[(String, CommandError)]) -> String {
    attempts
        .iter()
        .map(|(cmd, err)| format!("{}: {}", cmd, err))
        .collect::<Vec<_>>()
        .join("; ")
}
