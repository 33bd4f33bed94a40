// src/config/user.rs

//! Per-user settings stored in `~/.cpp-dev-tools.json`.
//!
//! Every field is an optional command template. A field that is present but
//! malformed produces a warning and is treated as unset; commands needing an
//! unset field report it when they are invoked.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::template::TemplateString;

pub const USER_CONFIG_FILE_NAME: &str = ".cpp-dev-tools.json";

pub const DEFAULT_USER_CONFIG: &str = "{
  // Open file links from the output in Sublime Text:
  //\"open_in_editor_command\": \"subl {}\"
  // Open file links from the output in VSCode:
  //\"open_in_editor_command\": \"code {}\"
  // Debug tasks with gdb:
  //\"debug_command\": \"gdb -ex run --args {}\"
  // Run the debugger in a new terminal tab:
  //\"execute_in_new_terminal_tab_command\": \"gnome-terminal --tab -- {}\"
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConfigField {
    OpenInEditor,
    Debug,
    ExecuteInNewTerminalTab,
}

impl UserConfigField {
    pub const ALL: [UserConfigField; 3] = [
        UserConfigField::OpenInEditor,
        UserConfigField::Debug,
        UserConfigField::ExecuteInNewTerminalTab,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            UserConfigField::OpenInEditor => "open_in_editor_command",
            UserConfigField::Debug => "debug_command",
            UserConfigField::ExecuteInNewTerminalTab => "execute_in_new_terminal_tab_command",
        }
    }

    fn format_hint(&self) -> &'static str {
        match self {
            UserConfigField::OpenInEditor => "'notepad++ {}', where {} will be replaced with a file name",
            UserConfigField::Debug => "'gdb --args {}', where {} will be replaced with a command to debug",
            UserConfigField::ExecuteInNewTerminalTab => {
                "'terminal -- {}', where {} will be replaced with a command to execute"
            }
        }
    }

    pub fn format_error(&self) -> String {
        format!("'{}': must be a string in format: {}", self.key(), self.format_hint())
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawUserConfig {
    open_in_editor_command: Option<Value>,
    debug_command: Option<Value>,
    execute_in_new_terminal_tab_command: Option<Value>,
}

impl RawUserConfig {
    fn get(&self, field: UserConfigField) -> Option<&Value> {
        match field {
            UserConfigField::OpenInEditor => self.open_in_editor_command.as_ref(),
            UserConfigField::Debug => self.debug_command.as_ref(),
            UserConfigField::ExecuteInNewTerminalTab => {
                self.execute_in_new_terminal_tab_command.as_ref()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserConfig {
    pub path: PathBuf,
    pub open_in_editor: Option<TemplateString>,
    pub debug: Option<TemplateString>,
    pub execute_in_new_terminal_tab: Option<TemplateString>,
}

impl UserConfig {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, field: UserConfigField) -> Option<&TemplateString> {
        match field {
            UserConfigField::OpenInEditor => self.open_in_editor.as_ref(),
            UserConfigField::Debug => self.debug.as_ref(),
            UserConfigField::ExecuteInNewTerminalTab => self.execute_in_new_terminal_tab.as_ref(),
        }
    }

    fn set(&mut self, field: UserConfigField, template: TemplateString) {
        let slot = match field {
            UserConfigField::OpenInEditor => &mut self.open_in_editor,
            UserConfigField::Debug => &mut self.debug,
            UserConfigField::ExecuteInNewTerminalTab => &mut self.execute_in_new_terminal_tab,
        };
        *slot = Some(template);
    }

    /// Message shown when a command needs a field that is not set.
    pub fn not_specified_message(&self, field: UserConfigField) -> String {
        format!("'{}' is not specified in {}", field.key(), self.path.display())
    }
}

/// Path of the user config inside `home`.
pub fn user_config_path(home: &Path) -> PathBuf {
    home.join(USER_CONFIG_FILE_NAME)
}

/// Load the user config, creating it with commented examples if missing.
///
/// Returns the config and the warnings to show the user.
pub fn load_user_config(path: &Path) -> io::Result<(UserConfig, Vec<String>)> {
    if !path.exists() {
        info!(path = %path.display(), "creating default user config");
        fs::write(path, DEFAULT_USER_CONFIG)?;
    }
    let contents = fs::read_to_string(path)?;
    Ok(parse_user_config(path, &contents))
}

pub fn parse_user_config(path: &Path, contents: &str) -> (UserConfig, Vec<String>) {
    let mut config = UserConfig::empty(path);
    let mut warnings = Vec::new();

    let raw: RawUserConfig = match serde_json::from_str(&strip_json_comments(contents)) {
        Ok(raw) => raw,
        Err(e) => {
            warnings.push(format!("Failed to parse {}: {e}", path.display()));
            return (config, warnings);
        }
    };

    for field in UserConfigField::ALL {
        let Some(value) = raw.get(field) else { continue };
        match value.as_str().and_then(TemplateString::parse) {
            Some(template) => config.set(field, template),
            None => warnings.push(field.format_error()),
        }
    }
    debug!(path = %path.display(), warnings = warnings.len(), "user config loaded");
    (config, warnings)
}

/// Remove `//` line comments and `/* */` block comments outside of strings.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_to_empty() {
        let (config, warnings) = parse_user_config(Path::new("/home/u/.cpp-dev-tools.json"), DEFAULT_USER_CONFIG);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(config.open_in_editor.is_none());
        assert!(config.debug.is_none());
    }

    #[test]
    fn valid_templates_are_loaded() {
        let contents = r#"{
            // editor
            "open_in_editor_command": "code {}",
            /* debugger */
            "debug_command": "gdb --args {}",
            "execute_in_new_terminal_tab_command": "tab -- {}"
        }"#;
        let (config, warnings) = parse_user_config(Path::new("cfg.json"), contents);
        assert!(warnings.is_empty());
        assert_eq!(config.get(UserConfigField::OpenInEditor).unwrap().apply("a:1"), "code a:1");
        assert_eq!(config.get(UserConfigField::Debug).unwrap().as_str(), "gdb --args {}");
        assert!(config.execute_in_new_terminal_tab.is_some());
    }

    #[test]
    fn malformed_fields_become_warnings() {
        let contents = r#"{"open_in_editor_command": "my-editor", "debug_command": 3}"#;
        let (config, warnings) = parse_user_config(Path::new("cfg.json"), contents);
        assert!(config.open_in_editor.is_none());
        assert!(config.debug.is_none());
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("'open_in_editor_command': must be a string in format"));
        assert!(warnings[1].starts_with("'debug_command': must be a string in format"));
    }

    #[test]
    fn comment_markers_inside_strings_are_kept() {
        let stripped = strip_json_comments(r#"{"a": "http://x/*y*/"} // tail"#);
        assert_eq!(stripped.trim_end(), r#"{"a": "http://x/*y*/"}"#);
    }

    #[test]
    fn not_specified_message_names_field_and_path() {
        let config = UserConfig::empty("/home/u/.cpp-dev-tools.json");
        assert_eq!(
            config.not_specified_message(UserConfigField::Debug),
            "'debug_command' is not specified in /home/u/.cpp-dev-tools.json"
        );
    }
}
