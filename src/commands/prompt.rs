//! Interactive template variable prompts

use std::io::IsTerminal;

use inquire::Text;

use regkit::error::Result;
use regkit::template::{InteractiveProvider, PromptRequest};

/// Prompting needs a terminal on stdin and must not be switched off
pub fn can_prompt(non_interactive: bool) -> bool {
    !non_interactive && std::io::stdin().is_terminal()
}

/// Asks for missing variable values with `inquire`
#[derive(Debug, Default)]
pub struct InquireProvider;

impl InteractiveProvider for InquireProvider {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> Result<Option<String>> {
        let message = format!("{} ({})", request.variable, request.declared_by);
        let mut text = Text::new(&message);
        if let Some(description) = request.description {
            text = text.with_help_message(description);
        }
        if let Some(default) = request.default {
            text = text.with_default(default);
        }

        let value = text.prompt_skippable()?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}
