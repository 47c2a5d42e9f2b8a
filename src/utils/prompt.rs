use std::io::{self, Write};

/// Channel through which the linker asks its yes/no questions
/// (backup overwrites, directory adoption).
///
/// The CLI injects a stdin-backed handler; tests supply a scripted one.
pub trait PromptHandler {
    fn ask_yes_no(&self, question: &str, default: bool) -> bool;
}

/// Stdin-backed handler used by the CLI.
pub struct InteractivePrompt;

impl PromptHandler for InteractivePrompt {
    fn ask_yes_no(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{} {}: ", question, hint);
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return default;
        }

        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }
    }
}

#[cfg(test)]
pub struct ScriptedPrompt {
    answers: std::cell::RefCell<std::collections::VecDeque<bool>>,
    fallback: bool,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: std::cell::RefCell::new(answers.iter().copied().collect()),
            fallback: false,
        }
    }

    pub fn always(answer: bool) -> Self {
        Self {
            answers: std::cell::RefCell::new(std::collections::VecDeque::new()),
            fallback: answer,
        }
    }
}

#[cfg(test)]
impl PromptHandler for ScriptedPrompt {
    fn ask_yes_no(&self, _question: &str, _default: bool) -> bool {
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
