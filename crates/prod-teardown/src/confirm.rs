//! Operator confirmation before anything is deleted

use crate::config::OutputFormat;
use prod_teardown_common::RunMode;
use prod_teardown_common::defaults::CONFIRMATION_TOKEN;
use std::io::{self, BufRead, Write};

/// Prompts on `output` and reads one answer from `input`.
pub struct ConfirmationGate<R, W> {
    input: R,
    output: W,
}

impl ConfirmationGate<io::StdinLock<'static>, Box<dyn Write>> {
    /// Gate on the terminal. The prompt goes to stderr when stdout is
    /// reserved for machine-readable output.
    pub fn terminal(format: OutputFormat) -> Self {
        let output: Box<dyn Write> = if format.reserves_stdout() {
            Box::new(io::stderr())
        } else {
            Box::new(io::stdout())
        };
        Self::new(io::stdin().lock(), output)
    }
}

impl<R: BufRead, W: Write> ConfirmationGate<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// True if the execution pass may run.
    ///
    /// ReportOnly never prompts. Execute requires the operator to type
    /// `yes` (any case); empty input, EOF or anything else declines.
    pub fn confirm(&mut self, mode: RunMode) -> io::Result<bool> {
        if mode.is_report_only() {
            return Ok(true);
        }

        write!(
            self.output,
            "\nAre you sure you want to delete these resources? This cannot be undone. \
             (type '{CONFIRMATION_TOKEN}' to continue): "
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

/// True iff the answer is the confirmation token, ignoring case and
/// surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(CONFIRMATION_TOKEN)
}
