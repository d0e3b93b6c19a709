//! Command transport seam
//!
//! The engine renders commands to [`CommandSpec`] values and hands them to a
//! [`CommandExecutor`]. The executor owns HTTP concerns (base URL, auth,
//! retries of connection setup); the engine owns everything semantic. The
//! error split matters: a rejection is a definitive platform answer, a
//! transport failure leaves the outcome unknown.

use async_trait::async_trait;
use thiserror::Error;

use crate::command::CommandSpec;
use crate::domain::shared::error::{DomainError, PlatformRejection};

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The platform answered and said no.
    #[error("rejected: {0}")]
    Rejected(PlatformRejection),

    /// No definitive answer: connection refused, timeout, 5xx without a
    /// parseable error body. The command may or may not have run.
    #[error("transport: {0}")]
    Transport(#[from] anyhow::Error),
}

impl From<ExecuteError> for DomainError {
    fn from(err: ExecuteError) -> Self {
        match err {
            ExecuteError::Rejected(rejection) => DomainError::Rejected(rejection),
            ExecuteError::Transport(cause) => DomainError::UnknownOutcome(cause),
        }
    }
}

/// Executes rendered commands against the platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run one command and return the raw response body. DELETE responses
    /// with no body return `serde_json::Value::Null`.
    async fn execute(&self, spec: CommandSpec) -> Result<serde_json::Value, ExecuteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CallCommand, Command, Method};
    use crate::domain::shared::value_objects::CallControlId;
    use mockall::predicate;
    use serde_json::json;

    #[test]
    fn test_executor_receives_rendered_spec() {
        tokio_test::block_on(async {
            let command = Command::Call(CallCommand::Answer {
                call_control_id: CallControlId::new("v3:leg-a"),
                request: Default::default(),
            });
            let spec = command.spec().unwrap();

            let mut executor = MockCommandExecutor::new();
            executor
                .expect_execute()
                .with(predicate::function(|s: &CommandSpec| {
                    s.path == "/calls/v3:leg-a/actions/answer" && s.method == Method::Post
                }))
                .times(1)
                .returning(|_| Ok(json!({"result": "ok"})));

            executor.execute(spec).await.unwrap();
        });
    }

    #[test]
    fn test_error_split_maps_to_domain_errors() {
        let rejected = ExecuteError::Rejected(PlatformRejection {
            code: "10002".to_string(),
            title: "Invalid state".to_string(),
            detail: "call already answered".to_string(),
        });
        assert!(matches!(
            DomainError::from(rejected),
            DomainError::Rejected(_)
        ));

        let transport = ExecuteError::Transport(anyhow::anyhow!("timeout"));
        assert!(matches!(
            DomainError::from(transport),
            DomainError::UnknownOutcome(_)
        ));
    }
}
