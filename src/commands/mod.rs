// src/commands/mod.rs

//! User commands typed at the `(cdt)` prompt.
//!
//! A command is an alphabetic name followed by an optional 1-based index,
//! e.g. `t3` or `gtr12`. Whitespace anywhere in the input is ignored.

use std::fmt;
use std::io::{self, Write};

use crate::output::colors::{GREEN, RESET};

/// A parsed line of user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCommand {
    pub cmd: String,
    /// 1-based index, 0 when none was given.
    pub arg: usize,
    /// Set once a handler consumed the command. An empty input line
    /// clears it so the same command runs again.
    pub executed: bool,
}

impl UserCommand {
    pub fn parse(input: &str) -> Self {
        let mut cmd = String::new();
        let mut digits = String::new();
        for c in input.chars().filter(|c| !c.is_whitespace()) {
            if c.is_ascii_digit() {
                digits.push(c);
            } else {
                cmd.push(c);
            }
        }
        Self {
            cmd,
            arg: digits.parse().unwrap_or(0),
            executed: false,
        }
    }

    /// 0-based index of the argument if it addresses one of `len` items.
    pub fn index_in(&self, len: usize) -> Option<usize> {
        (1..=len).contains(&self.arg).then(|| self.arg - 1)
    }
}

impl fmt::Display for UserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arg == 0 {
            write!(f, "{}", self.cmd)
        } else {
            write!(f, "{}{}", self.cmd, self.arg)
        }
    }
}

/// Every command the prompt understands, in help order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Task,
    TaskRepeat,
    Debug,
    SelectExecution,
    Open,
    Search,
    Gtest,
    GtestSearch,
    GtestRerun,
    GtestRerunRepeat,
    GtestDebug,
    GtestFilter,
    Help,
}

impl CommandKind {
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Task,
        CommandKind::TaskRepeat,
        CommandKind::Debug,
        CommandKind::SelectExecution,
        CommandKind::Open,
        CommandKind::Search,
        CommandKind::Gtest,
        CommandKind::GtestSearch,
        CommandKind::GtestRerun,
        CommandKind::GtestRerunRepeat,
        CommandKind::GtestDebug,
        CommandKind::GtestFilter,
        CommandKind::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Task => "t",
            CommandKind::TaskRepeat => "tr",
            CommandKind::Debug => "d",
            CommandKind::SelectExecution => "exec",
            CommandKind::Open => "o",
            CommandKind::Search => "s",
            CommandKind::Gtest => "g",
            CommandKind::GtestSearch => "gs",
            CommandKind::GtestRerun => "gt",
            CommandKind::GtestRerunRepeat => "gtr",
            CommandKind::GtestDebug => "gd",
            CommandKind::GtestFilter => "gf",
            CommandKind::Help => "h",
        }
    }

    /// Name of the argument shown in help, empty if the command takes none.
    pub fn arg(self) -> &'static str {
        match self {
            CommandKind::Search | CommandKind::Help => "",
            _ => "ind",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CommandKind::Task => "Execute the task with the specified index",
            CommandKind::TaskRepeat => {
                "Keep executing the task with the specified index until it fails"
            }
            CommandKind::Debug => {
                "Execute the task with the specified index with a debugger attached"
            }
            CommandKind::SelectExecution => {
                "Change currently selected execution (gets reset to the most recent one after every new execution)"
            }
            CommandKind::Open => "Open the file link with the specified index in your code editor",
            CommandKind::Search => {
                "Search through output of the selected executed task with the specified regular expression"
            }
            CommandKind::Gtest => "Display output of the specified google test",
            CommandKind::GtestSearch => {
                "Search through output of the specified google test with the specified regular expression"
            }
            CommandKind::GtestRerun => "Re-run the google test with the specified index",
            CommandKind::GtestRerunRepeat => {
                "Keep re-running the google test with the specified index until it fails"
            }
            CommandKind::GtestDebug => {
                "Re-run the google test with the specified index with debugger attached"
            }
            CommandKind::GtestFilter => {
                "Run google tests of the task with the specified index with a specified --gtest_filter"
            }
            CommandKind::Help => "Display list of user commands",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Commands that launch a debugger and need the debug templates.
    pub fn needs_debugger(self) -> bool {
        self.name().contains('d')
    }
}

/// Print the `h` listing.
pub fn write_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{GREEN}User commands:{RESET}")?;
    for kind in CommandKind::ALL {
        let (name, arg) = (kind.name(), kind.arg());
        let arg_text = if arg.is_empty() {
            String::new()
        } else {
            format!("<{arg}>")
        };
        let sep = if name.len() + arg.len() < 6 { "\t\t" } else { "\t" };
        writeln!(out, "{name}{arg_text}{sep}{}", kind.description())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_index() {
        let cmd = UserCommand::parse(" gtr 12 ");
        assert_eq!(cmd.cmd, "gtr");
        assert_eq!(cmd.arg, 12);
        assert!(!cmd.executed);

        let cmd = UserCommand::parse("s");
        assert_eq!((cmd.cmd.as_str(), cmd.arg), ("s", 0));
    }

    #[test]
    fn index_is_bounds_checked() {
        let cmd = UserCommand::parse("o2");
        assert_eq!(cmd.index_in(2), Some(1));
        assert_eq!(cmd.index_in(1), None);
        assert_eq!(UserCommand::parse("o").index_in(3), None);
        assert_eq!(UserCommand::parse("o0").index_in(3), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for text in ["t11", "h", "gtr3"] {
            assert_eq!(UserCommand::parse(text).to_string(), text);
        }
    }

    #[test]
    fn debugger_commands() {
        let debug: Vec<_> = CommandKind::ALL
            .into_iter()
            .filter(|k| k.needs_debugger())
            .map(CommandKind::name)
            .collect();
        assert_eq!(debug, vec!["d", "gd"]);
    }

    #[test]
    fn help_uses_two_tabs_for_short_names() {
        let mut out = Vec::new();
        write_help(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], format!("{GREEN}User commands:{RESET}"));
        assert_eq!(lines[1], "t<ind>\t\tExecute the task with the specified index");
        assert!(lines.contains(
            &"gtr<ind>\tKeep re-running the google test with the specified index until it fails"
        ));
        assert!(lines.contains(&"exec<ind>\tChange currently selected execution (gets reset to the most recent one after every new execution)"));
        assert_eq!(lines.last(), Some(&"h\t\tDisplay list of user commands"));
    }
}
