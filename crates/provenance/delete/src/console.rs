//! User-facing collaborators of the deletion command: output and confirmation.

use serde::{Deserialize, Serialize};

/// How much the deletion command reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Verbosity {
    /// Nothing beyond warnings and failures.
    #[default]
    Silent,
    /// Closure size and phase transitions.
    Summary,
    /// Summary plus one line per node in the closure.
    Itemized,
}

impl From<Verbosity> for u8 {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Silent => 0,
            Verbosity::Summary => 1,
            Verbosity::Itemized => 2,
        }
    }
}

impl TryFrom<u8> for Verbosity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Verbosity::Silent),
            1 => Ok(Verbosity::Summary),
            2 => Ok(Verbosity::Itemized),
            other => Err(format!("verbosity must be 0, 1 or 2, got {other}")),
        }
    }
}

/// Sink for user-visible output.
pub trait Echo {
    fn echo(&mut self, line: &str);
    fn warn(&mut self, line: &str);
}

/// Writes to stdout, warnings to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdEcho;

impl Echo for StdEcho {
    fn echo(&mut self, line: &str) {
        println!("{line}");
    }

    fn warn(&mut self, line: &str) {
        eprintln!("Warning: {line}");
    }
}

/// Collects output in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferedEcho {
    pub lines: Vec<String>,
    pub warnings: Vec<String>,
}

impl BufferedEcho {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_silent(&self) -> bool {
        self.lines.is_empty() && self.warnings.is_empty()
    }
}

impl Echo for BufferedEcho {
    fn echo(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn warn(&mut self, line: &str) {
        self.warnings.push(line.to_string());
    }
}

/// Yes/no confirmation before an irreversible step.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_orders_by_detail() {
        assert!(Verbosity::Silent < Verbosity::Summary);
        assert!(Verbosity::Summary < Verbosity::Itemized);
    }

    #[test]
    fn verbosity_from_level() {
        assert_eq!(Verbosity::try_from(2u8).unwrap(), Verbosity::Itemized);
        assert!(Verbosity::try_from(3u8).is_err());
        assert_eq!(u8::from(Verbosity::Summary), 1);
    }

    #[test]
    fn closures_confirm() {
        let mut asked = Vec::new();
        let mut confirm = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        assert!(!confirm.confirm("Shall I continue?"));
        drop(confirm);
        assert_eq!(asked, vec!["Shall I continue?"]);
    }

    #[test]
    fn buffered_echo_separates_warnings() {
        let mut echo = BufferedEcho::new();
        assert!(echo.is_silent());
        echo.echo("I will delete 3 nodes");
        echo.warn("node 9 does not exist, skipping");
        assert_eq!(echo.lines.len(), 1);
        assert_eq!(echo.warnings.len(), 1);
    }
}
