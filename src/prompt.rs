use crate::error::PromptError;
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;

pub const MAX_ATTEMPTS: usize = 3;

/// Line-oriented prompts with a bounded number of attempts per question.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    max_attempts: usize,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Eof);
        }
        Ok(line.trim().to_string())
    }

    /// Asks until a non-empty answer is given.
    pub fn ask_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        for _ in 0..self.max_attempts {
            let line = self.read_line(prompt)?;
            if !line.is_empty() {
                return Ok(line);
            }
            writeln!(self.output, "A value is required.")?;
        }
        Err(PromptError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Blank answers fall back to `default`.
    pub fn ask_line_or(&mut self, prompt: &str, default: &str) -> Result<String, PromptError> {
        let line = self.read_line(prompt)?;
        Ok(if line.is_empty() { default.to_string() } else { line })
    }

    pub fn ask_choice(
        &mut self,
        prompt: &str,
        range: RangeInclusive<usize>,
    ) -> Result<usize, PromptError> {
        for _ in 0..self.max_attempts {
            let line = self.read_line(prompt)?;
            match line.parse::<usize>() {
                Ok(n) if range.contains(&n) => return Ok(n),
                Ok(_) => writeln!(self.output, "Invalid choice. Try again.")?,
                Err(_) => writeln!(self.output, "Invalid input. Please enter a valid number.")?,
            }
        }
        Err(PromptError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Numbered menu over `items`; returns the selected index.
    pub fn select(&mut self, title: &str, items: &[String]) -> Result<usize, PromptError> {
        writeln!(self.output, "\n{title}")?;
        writeln!(self.output, "================================================================")?;
        for (index, item) in items.iter().enumerate() {
            writeln!(self.output, "{}. {item}", index + 1)?;
        }
        writeln!(self.output, "================================================================")?;
        let n = self.ask_choice("Enter your choice: ", 1..=items.len())?;
        Ok(n - 1)
    }
}
