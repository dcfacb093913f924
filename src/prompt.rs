//! Interactive MFA code entry.

use crate::validation::{trim_line_ending, validate_mfa_code};
use crate::{Result, RooError};
use dialoguer::{theme::ColorfulTheme, Input};
use tracing::{debug, warn};

/// Number of times the user is asked for a code before giving up.
pub const MAX_CODE_PROMPTS: usize = 3;

/// Source of MFA one-time codes.
pub trait CodePrompt: Send + Sync {
    /// Asks for one code. The returned string is not validated yet.
    fn prompt_code(&self) -> Result<String>;
}

/// Prompts on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl CodePrompt for TerminalPrompt {
    fn prompt_code(&self) -> Result<String> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("MFA Code")
            .interact_text()
            .map_err(|e| RooError::Other(anyhow::anyhow!("Failed to read MFA code: {}", e)))
    }
}

/// Returns a valid MFA code.
///
/// A code given on the command line is validated and used as-is; otherwise
/// `prompt` is asked up to [`MAX_CODE_PROMPTS`] times.
///
/// # Errors
///
/// Returns [`RooError::InvalidMfaCode`] if the supplied code is invalid or no
/// prompt attempt produced a valid one.
pub fn obtain_mfa_code(supplied: Option<&str>, prompt: &dyn CodePrompt) -> Result<String> {
    if let Some(code) = supplied {
        let code = trim_line_ending(code);
        validate_mfa_code(code)?;
        return Ok(code.to_string());
    }

    let mut last_error = None;
    for attempt in 1..=MAX_CODE_PROMPTS {
        let input = prompt.prompt_code()?;
        let code = trim_line_ending(&input);
        debug!(attempt, "MFA code provided");

        match validate_mfa_code(code) {
            Ok(()) => return Ok(code.to_string()),
            Err(e) => {
                warn!("{}", e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        RooError::InvalidMfaCode("please provide the MFA code via --code".to_string())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedPrompt {
        answers: Mutex<Vec<&'static str>>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&'static str]) -> Self {
            let mut answers = answers.to_vec();
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
            }
        }

        fn remaining(&self) -> usize {
            self.answers.lock().unwrap().len()
        }
    }

    impl CodePrompt for ScriptedPrompt {
        fn prompt_code(&self) -> Result<String> {
            self.answers
                .lock()
                .unwrap()
                .pop()
                .map(str::to_string)
                .ok_or_else(|| RooError::Other(anyhow::anyhow!("no more answers")))
        }
    }

    #[test]
    fn test_supplied_code_skips_prompt() {
        let prompt = ScriptedPrompt::new(&["999999"]);
        let code = obtain_mfa_code(Some("123456"), &prompt).unwrap();
        assert_eq!(code, "123456");
        assert_eq!(prompt.remaining(), 1);
    }

    #[test]
    fn test_invalid_supplied_code() {
        let prompt = ScriptedPrompt::new(&[]);
        let result = obtain_mfa_code(Some("12ab"), &prompt);
        assert!(matches!(result, Err(RooError::InvalidMfaCode(_))));
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let prompt = ScriptedPrompt::new(&["abc", "123\r\n", "054389\r\n"]);
        let code = obtain_mfa_code(None, &prompt).unwrap();
        assert_eq!(code, "054389");
    }

    #[test]
    fn test_prompt_gives_up_after_three_attempts() {
        let prompt = ScriptedPrompt::new(&["a", "b", "c", "123456"]);
        let result = obtain_mfa_code(None, &prompt);
        assert!(matches!(result, Err(RooError::InvalidMfaCode(_))));
        assert_eq!(prompt.remaining(), 1);
    }
}
