//! Prefix command parsing.

/// Which handler a command routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Group,
    Nickname,
    Tid,
    Uid,
    Fight,
    Stop,
    Unknown,
}

impl CommandKind {
    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "group" => Self::Group,
            "nickname" => Self::Nickname,
            "tid" => Self::Tid,
            "uid" => Self::Uid,
            "fyt" => Self::Fight,
            "stop" => Self::Stop,
            _ => Self::Unknown,
        }
    }
}

/// A command line after the prefix has been stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub args: Vec<String>,
}

impl Command {
    /// Parse `text` as a command if it starts with `prefix`.
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let rest = text.strip_prefix(prefix)?;
        let mut tokens = rest.split_whitespace();
        let kind = CommandKind::from_name(tokens.next().unwrap_or(""));
        let args = tokens.map(str::to_string).collect();
        Some(Self { kind, args })
    }

    /// First argument, e.g. `on` in `group on Family`.
    pub fn sub_command(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Arguments after the sub-command, joined by single spaces.
    pub fn tail(&self) -> String {
        self.args.iter().skip(1).map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}
