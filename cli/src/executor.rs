#![deny(missing_docs)]

//! # Executor
//!
//! Runs the external tools the CLI depends on (`controller-gen`, `openssl`).
//!
//! Abstracted so commands can be tested without the tools installed.

use crate::error::{CliError, CliResult};
use std::process::{Command, Output};
use tracing::debug;

/// Interface for executing external commands.
pub trait CommandExecutor {
    /// Executes the command and returns the output.
    fn execute(&self, program: &str, args: &[&str]) -> CliResult<Output>;
}

/// Standard executor using `std::process::Command`.
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, program: &str, args: &[&str]) -> CliResult<Output> {
        debug!(program, ?args, "running command");
        let output = Command::new(program).args(args).output()?;
        Ok(output)
    }
}

/// Executes `program` and turns a non-zero exit into [`CliError::Tool`].
pub fn run_checked(
    executor: &dyn CommandExecutor,
    program: &str,
    args: &[&str],
) -> CliResult<Output> {
    let output = executor.execute(program, args)?;
    if !output.status.success() {
        return Err(CliError::Tool {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    type Effect = Box<dyn Fn(&[&str])>;

    /// Records every command and optionally fails or runs a side effect.
    pub(crate) struct MockExecutor {
        pub(crate) commands: RefCell<Vec<(String, Vec<String>)>>,
        should_fail: bool,
        effect: Option<Effect>,
    }

    impl MockExecutor {
        pub(crate) fn new(should_fail: bool) -> Self {
            Self {
                commands: RefCell::new(Vec::new()),
                should_fail,
                effect: None,
            }
        }

        pub(crate) fn with_effect(effect: impl Fn(&[&str]) + 'static) -> Self {
            Self {
                effect: Some(Box::new(effect)),
                ..Self::new(false)
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn execute(&self, program: &str, args: &[&str]) -> CliResult<Output> {
            self.commands.borrow_mut().push((
                program.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ));
            if let Some(effect) = &self.effect {
                effect(args);
            }

            let status = if self.should_fail {
                ExitStatus::from_raw(1 << 8)
            } else {
                ExitStatus::from_raw(0)
            };

            Ok(Output {
                status,
                stdout: Vec::new(),
                stderr: if self.should_fail {
                    b"Mock Error".to_vec()
                } else {
                    Vec::new()
                },
            })
        }
    }

    #[test]
    fn test_run_checked_success() {
        let executor = MockExecutor::new(false);
        assert!(run_checked(&executor, "controller-gen", &["crd"]).is_ok());
        let commands = executor.commands.take();
        assert_eq!(commands[0].0, "controller-gen");
        assert_eq!(commands[0].1, vec!["crd".to_string()]);
    }

    #[test]
    fn test_run_checked_failure() {
        let executor = MockExecutor::new(true);
        let err = run_checked(&executor, "openssl", &["req"]).unwrap_err();
        match err {
            CliError::Tool {
                program, stderr, ..
            } => {
                assert_eq!(program, "openssl");
                assert_eq!(stderr, "Mock Error");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
