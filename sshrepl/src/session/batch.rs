//! Ordered command batches.

/// An ordered sequence of command lines, executed one after the other.
///
/// Text input is split on newlines: trailing whitespace is trimmed from each
/// line and leading blank lines are dropped. Every other blank line is kept,
/// trailing ones included, since a blank line closes an indented block in a
/// REPL. The single newline terminating the text does not add a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<String>,
}

impl CommandBatch {
    /// Build a batch from newline-delimited text.
    pub fn from_text(text: &str) -> Self {
        let commands = text
            .lines()
            .map(str::trim_end)
            .skip_while(|l| l.is_empty())
            .map(str::to_string)
            .collect();
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}

impl From<&str> for CommandBatch {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for CommandBatch {
    fn from(text: String) -> Self {
        Self::from_text(&text)
    }
}

impl From<&String> for CommandBatch {
    fn from(text: &String) -> Self {
        Self::from_text(text)
    }
}

impl From<Vec<String>> for CommandBatch {
    fn from(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

impl From<Vec<&str>> for CommandBatch {
    fn from(commands: Vec<&str>) -> Self {
        commands.into_iter().collect()
    }
}

impl From<&[&str]> for CommandBatch {
    fn from(commands: &[&str]) -> Self {
        commands.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for CommandBatch {
    fn from(commands: [&str; N]) -> Self {
        commands.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().map(str::to_string).collect(),
        }
    }
}
