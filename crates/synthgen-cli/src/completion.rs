use std::io::Write;
use std::process::{Command, Stdio};

use synthgen_generate::{CompletionClient, GenerationError};

/// Completion backend that pipes the prompt to an external program's stdin
/// and reads the reply from its stdout.
#[derive(Debug, Clone)]
pub struct CommandCompletionClient {
    program: String,
    args: Vec<String>,
}

impl CommandCompletionClient {
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl CompletionClient for CommandCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                GenerationError::Completion(format!("failed to start '{}': {err}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).map_err(|err| {
                GenerationError::Completion(format!("failed to write prompt: {err}"))
            })?;
        }

        let output = child.wait_with_output().map_err(|err| {
            GenerationError::Completion(format!("'{}' did not finish: {err}", self.program))
        })?;
        if !output.status.success() {
            return Err(GenerationError::Completion(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandCompletionClient::new(&[]).is_none());
    }

    #[test]
    fn missing_program_is_a_completion_error() {
        let client = CommandCompletionClient::new(&["synthgen-no-such-binary".to_string()])
            .expect("client");
        let err = client.complete("prompt").expect_err("spawn fails");
        assert!(matches!(err, GenerationError::Completion(_)));
    }

    #[cfg(unix)]
    #[test]
    fn reply_is_read_from_stdout() {
        let client = CommandCompletionClient::new(&["cat".to_string()]).expect("client");
        let reply = client.complete("{\"name\": \"Ana\"}").expect("complete");
        assert_eq!(reply, "{\"name\": \"Ana\"}");
    }
}
