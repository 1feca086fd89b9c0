//! Terminal implementation of the [`Prompt`](crate::select::Prompt)
//! collaborator, built on `dialoguer`.

use crate::select::Prompt;
use crate::Result;
use dialoguer::{Input, Select};
use tracing::warn;

/// Interactive terminal prompt.
///
/// Filtering happens through the caller-supplied match predicate: the user
/// types a query, the candidate list narrows, and a single survivor is taken
/// directly while multiple survivors go through a pick list.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn select(
        &self,
        label: &str,
        candidates: &[String],
        matcher: &dyn Fn(&str, usize) -> bool,
    ) -> Result<usize> {
        loop {
            let query: String = Input::new()
                .with_prompt(label)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| anyhow::anyhow!("prompt failed: {e}"))?;

            let matches: Vec<usize> = (0..candidates.len())
                .filter(|&i| matcher(&query, i))
                .collect();

            match matches.as_slice() {
                [] => {
                    warn!("nothing matches {query:?}, try again");
                }
                [only] => return Ok(*only),
                _ => {
                    let items: Vec<&String> =
                        matches.iter().map(|&i| &candidates[i]).collect();
                    let picked = Select::new()
                        .with_prompt(label)
                        .items(&items)
                        .default(0)
                        .interact()
                        .map_err(|e| anyhow::anyhow!("prompt failed: {e}"))?;
                    return Ok(matches[picked]);
                }
            }
        }
    }

    fn input(&self, label: &str, default: &str) -> Result<String> {
        let mut prompt = Input::new().with_prompt(label);
        if !default.is_empty() {
            prompt = prompt.default(default.to_string());
        }
        prompt
            .interact_text()
            .map_err(|e| anyhow::anyhow!("prompt failed: {e}").into())
    }
}
