//! Continue-after-failure confirmation.
//!
//! Resolves a failed decryption interactively. Only an explicit yes
//! continues; anything else aborts.

use dialoguer::Confirm;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::core::extract::{Decision, DecryptFailure};

const QUESTION: &str = "Still continue?";

/// Ask the operator whether to continue past `failure`.
///
/// On a terminal this is a `dialoguer` confirmation defaulting to no. With
/// piped stdin one line is read and must be `y` or `yes`.
pub fn confirm_continue(failure: &DecryptFailure<'_>) -> Decision {
    tracing::debug!(alias = %failure.target.alias, error = %failure.error, "asking to continue");

    let accepted = if io::stdin().is_terminal() {
        Confirm::new()
            .with_prompt(QUESTION)
            .default(false)
            .interact()
            .unwrap_or(false)
    } else {
        eprint!("{} [y/N] ", QUESTION);
        let _ = io::stderr().flush();
        read_answer(io::stdin().lock())
    };

    if accepted {
        Decision::Continue
    } else {
        Decision::Abort
    }
}

/// Read one answer line; true only for an explicit affirmative.
fn read_answer(mut input: impl BufRead) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => is_affirmative(&line),
        Err(_) => false,
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes" | "YES")
}
