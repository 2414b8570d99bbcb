//! Terminal confirmation surface.

use async_trait::async_trait;
use tracing::warn;

use crate::cli::output;
use crate::infrastructure::traits::{ConfirmPrompt, Confirmation};

/// Asks on stdin. Accepts `y`, `yes` or the localized confirm label.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

fn accepts(answer: &str, confirm_label: &str) -> bool {
    let answer = answer.trim();
    !answer.is_empty()
        && (answer.eq_ignore_ascii_case("y")
            || answer.eq_ignore_ascii_case("yes")
            || answer.to_lowercase() == confirm_label.to_lowercase())
}

#[async_trait]
impl Confirmation for TerminalConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        let question = format!(
            "{} [{}/{}]",
            prompt.message, prompt.confirm_label, prompt.cancel_label
        );
        let confirm_label = prompt.confirm_label.clone();
        let answer = tokio::task::spawn_blocking(move || {
            output::prompt(&question);
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => accepts(&line, &confirm_label),
            Ok(Err(e)) => {
                warn!("confirm: reading stdin failed: {e}");
                false
            }
            Err(e) => {
                warn!("confirm: prompt task failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("y\n", true)]
    #[case("YES", true)]
    #[case("löschen", true)]
    #[case("n", false)]
    #[case("", false)]
    fn given_answer_when_checking_then_only_affirmative_accepted(
        #[case] answer: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(accepts(answer, "Löschen"), expected);
    }
}
