// src/config/template.rs

/// Placeholder substituted by [`TemplateString::apply`].
pub const TEMPLATE_ARG_PLACEHOLDER: &str = "{}";

/// A user-configured command with exactly one `{}` placeholder.
///
/// The placeholder offset is computed once at parse time. Only the first
/// `{}` is substituted; there is no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateString {
    str: String,
    arg_pos: usize,
}

impl TemplateString {
    /// Returns `None` when the string has no placeholder.
    pub fn parse(s: impl Into<String>) -> Option<Self> {
        let str = s.into();
        let arg_pos = str.find(TEMPLATE_ARG_PLACEHOLDER)?;
        Some(Self { str, arg_pos })
    }

    pub fn as_str(&self) -> &str {
        &self.str
    }

    pub fn arg_pos(&self) -> usize {
        self.arg_pos
    }

    pub fn apply(&self, arg: &str) -> String {
        let mut result = String::with_capacity(self.str.len() + arg.len());
        result.push_str(&self.str[..self.arg_pos]);
        result.push_str(arg);
        result.push_str(&self.str[self.arg_pos + TEMPLATE_ARG_PLACEHOLDER.len()..]);
        result
    }
}
