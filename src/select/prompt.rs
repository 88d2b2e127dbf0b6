use crate::error::Result;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Operator I/O used by the selection controller
pub trait Prompter {
    /// Show `choices` as a 1-based numbered list under `title`
    fn present_choices(&mut self, title: &str, choices: &[String]) -> Result<()>;

    /// Ask `question` and return the trimmed answer, or `None` once input is closed
    fn read_answer(&mut self, question: &str) -> Result<Option<String>>;

    /// Short status line for the operator (skips, saved files)
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Prompter over any line reader and writer (stdin/stdout in the binary)
#[derive(Debug)]
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompter bound to the process terminal
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Recover the writer (used to inspect output in tests)
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn present_choices(&mut self, title: &str, choices: &[String]) -> Result<()> {
        writeln!(self.output, "\n{title}")?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}) {choice}", i + 1)?;
        }
        self.output.flush()?;
        Ok(())
    }

    fn read_answer(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        self.output.flush()?;
        Ok(())
    }
}

/// Prompter answering from a fixed script, recording what was shown
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Every list presented, as `(title, choices)`
    pub shown: Vec<(String, Vec<String>)>,
    /// Every question asked
    pub questions: Vec<String>,
    /// Every notification
    pub messages: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Answers not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn present_choices(&mut self, title: &str, choices: &[String]) -> Result<()> {
        self.shown.push((title.to_string(), choices.to_vec()));
        Ok(())
    }

    fn read_answer(&mut self, question: &str) -> Result<Option<String>> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front().map(|a| a.trim().to_string()))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.messages.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_terminal_prompter_numbers_choices() {
        let mut prompter = TerminalPrompter::new(Cursor::new(" 2 \n"), Vec::new());
        prompter
            .present_choices("Available OS Versions:", &["alma9".to_string(), "rocky9".to_string()])
            .unwrap();
        let answer = prompter.read_answer("Select OS Version").unwrap();
        assert_eq!(answer.as_deref(), Some("2"));

        let output = String::from_utf8(prompter.into_output()).unwrap();
        assert!(output.contains("  1) alma9\n"));
        assert!(output.contains("  2) rocky9\n"));
        assert!(output.ends_with("Select OS Version: "));
    }

    #[test]
    fn test_terminal_prompter_eof() {
        let mut prompter = TerminalPrompter::new(Cursor::new(""), Vec::new());
        assert_eq!(prompter.read_answer("Select").unwrap(), None);
    }

    #[test]
    fn test_terminal_prompter_blank_line() {
        let mut prompter = TerminalPrompter::new(Cursor::new("\n"), Vec::new());
        assert_eq!(prompter.read_answer("Select").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_scripted_prompter_records() {
        let mut prompter = ScriptedPrompter::new(["1", ""]);
        prompter.present_choices("t", &["a".to_string()]).unwrap();
        assert_eq!(prompter.read_answer("q1").unwrap().as_deref(), Some("1"));
        assert_eq!(prompter.read_answer("q2").unwrap().as_deref(), Some(""));
        assert_eq!(prompter.read_answer("q3").unwrap(), None);
        assert_eq!(prompter.questions, vec!["q1", "q2", "q3"]);
        assert_eq!(prompter.shown.len(), 1);
    }
}
