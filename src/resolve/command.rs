//! External agent process as the resolution attempt.
//!
//! The agent is any program that reads an [`AttemptRequest`] as JSON on stdin
//! and prints a [`RawOutcome`] as JSON on the last non-empty line of stdout.
//! Anything it prints before that line is ignored, so agents may log freely.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AttemptError, Error, Result};
use crate::model::RawOutcome;

use super::{AttemptRequest, ResolutionAttempt};

/// Longest stderr excerpt kept in an [`AttemptError::Exited`].
const STDERR_TAIL: usize = 2000;

/// Resolution attempt that shells out to an agent program.
#[derive(Debug, Clone)]
pub struct CommandAttempt {
    program: String,
    args: Vec<String>,
}

impl CommandAttempt {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line such as
    /// `python -m my_agent.run`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the command line is blank.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| Error::Configuration("agent command is empty".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ResolutionAttempt for CommandAttempt {
    async fn attempt(&self, request: &AttemptRequest) -> std::result::Result<RawOutcome, AttemptError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("ARENA_MODEL", &request.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AttemptError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(program = %self.program, model = %request.model, "Agent started");

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(AttemptError::Exited {
                code: output.status.code(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL),
            });
        }

        parse_outcome(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the agent's final stdout line.
fn parse_outcome(stdout: &str) -> std::result::Result<RawOutcome, AttemptError> {
    let last = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| AttemptError::Other("agent printed no result".to_string()))?;
    Ok(serde_json::from_str(last.trim())?)
}

fn tail(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, IssueKind, IssueRef, SuccessState};
    use crate::resolve::AttemptConfig;

    fn request() -> AttemptRequest {
        AttemptRequest {
            issue: Issue {
                reference: IssueRef::new("octo", "widgets", 3, IssueKind::Issue),
                title: "t".into(),
                body: "b".into(),
                head_branch: None,
                review_comments: Vec::new(),
            },
            model: "model-A".into(),
            instruction: "fix".into(),
            config: AttemptConfig::default(),
        }
    }

    #[test]
    fn test_from_command_line() {
        let cmd = CommandAttempt::from_command_line("python -m agent.run --fast").unwrap();
        assert_eq!(cmd.program(), "python");
        assert_eq!(cmd.args, vec!["-m", "agent.run", "--fast"]);
        assert!(CommandAttempt::from_command_line("   ").is_err());
    }

    #[test]
    fn test_parse_outcome_uses_last_line() {
        let stdout = "starting agent\nstep 1\n{\"git_patch\":\"diff\",\"success\":false}\n\n";
        let raw = parse_outcome(stdout).unwrap();
        assert_eq!(raw.git_patch, "diff");
        assert_eq!(SuccessState::from(raw.success), SuccessState::Failed);
    }

    #[test]
    fn test_parse_outcome_rejects_garbage() {
        assert!(matches!(parse_outcome("not json"), Err(AttemptError::MalformedOutput(_))));
        assert!(matches!(parse_outcome(""), Err(AttemptError::Other(_))));
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("0123456789abc", 3), "...abc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let cmd = CommandAttempt::new("/nonexistent/arena-agent", Vec::new());
        let err = cmd.attempt(&request()).await.unwrap_err();
        assert!(matches!(err, AttemptError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_agent_output_is_parsed() {
        let script = r#"cat > /dev/null; echo '{"base_commit":"abc123","git_patch":"p","success":true}'"#;
        let cmd = CommandAttempt::new("sh", vec!["-c".into(), script.into()]);

        let raw = cmd.attempt(&request()).await.unwrap();

        assert_eq!(raw.base_commit, "abc123");
        assert_eq!(raw.success, Some(true));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_captured() {
        let cmd = CommandAttempt::new("sh", vec!["-c".into(), "cat > /dev/null; echo oops >&2; exit 3".into()]);

        let err = cmd.attempt(&request()).await.unwrap_err();

        match err {
            AttemptError::Exited { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
