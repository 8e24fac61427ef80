use std::io::{self, BufRead, StdinLock, Stdout, Write};

use anyhow::{bail, Context, Result};

/// Line-oriented operator dialogue: every question is a prompt followed by
/// one line of input.
pub struct Console<R, W> {
    input: R,
    output: W,
    /// Read secrets from the terminal without echo instead of from `input`.
    hide_secrets: bool,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
            hide_secrets: true,
        }
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Console over arbitrary streams; secrets are read from `input` like any
    /// other answer.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Print a line.
    pub fn say(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", text.as_ref()).context("failed to write to console")?;
        self.output.flush().context("failed to write to console")
    }

    /// Print `prompt` and return the answer without its line ending.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("failed to write to console")?;
        self.output.flush().context("failed to write to console")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read from console")?;
        if read == 0 {
            bail!("input closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Wait for Enter.
    pub fn pause(&mut self, prompt: &str) -> Result<()> {
        self.ask(prompt).map(drop)
    }

    /// `[Y/n]` question; an empty answer means yes.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        loop {
            let answer = self.ask(prompt)?;
            match answer.trim().to_lowercase().as_str() {
                "" | "y" => return Ok(true),
                "n" => return Ok(false),
                _ => self.say("\nWrong entry, try a 'y' or 'n' this time...")?,
            }
        }
    }

    /// Numbered menu; re-asks until the answer is one of the listed numbers.
    pub fn choose<T: Clone>(&mut self, header: &str, options: &[(String, T)]) -> Result<T> {
        loop {
            self.say(header)?;
            for (idx, (label, _)) in options.iter().enumerate() {
                self.say(format!("{}) {label}", idx + 1))?;
            }
            let answer = self.ask("\nAnswer: ")?;
            let picked = answer
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| options.get(idx));
            match picked {
                Some((_, value)) => return Ok(value.clone()),
                None => self.say("\n\nThat's not a number in the list, try again...")?,
            }
        }
    }

    /// Ask for a secret. On a terminal the answer is not echoed.
    pub fn secret(&mut self, prompt: &str) -> Result<String> {
        if self.hide_secrets {
            rpassword::prompt_password(prompt).context("failed to read password")
        } else {
            self.ask(prompt)
        }
    }
}
