//! Command text parsing and command registration routes.

/// Dispatch key for a message: its first whitespace-delimited token.
pub fn command_key(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Message text split into the leading command token and its arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    /// Arguments joined with single spaces.
    pub args: String,
    pub args_list: Vec<String>,
}

impl CommandInvocation {
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let command = tokens.next().unwrap_or("").to_string();
        let args_list: Vec<String> = tokens.map(str::to_string).collect();
        Self {
            command,
            args: args_list.join(" "),
            args_list,
        }
    }

    pub fn has_args(&self) -> bool {
        !self.args_list.is_empty()
    }

    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args_list.get(idx).map(String::as_str)
    }
}

/// Which keys a command handler is registered under.
///
/// A route with neither a command nor aliases is the default (catch-all) route.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandRoute {
    pub command: Option<String>,
    pub aliases: Vec<String>,
    pub prefixes: Vec<String>,
}

impl CommandRoute {
    /// Route for messages that match no other key.
    pub fn fallback() -> Self {
        Self::default()
    }

    pub fn command(name: impl Into<String>) -> Self {
        Self {
            command: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn aliases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_aliases<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.command.is_none() && self.aliases.is_empty()
    }

    /// Expand into concrete dispatch keys.
    ///
    /// With prefixes, every name becomes `prefix + name` for each prefix and the
    /// bare name is not registered. Duplicates are removed, order is kept.
    pub fn keys(&self) -> Vec<String> {
        let names = self.command.iter().chain(self.aliases.iter());
        let mut keys: Vec<String> = Vec::new();
        for name in names {
            if self.prefixes.is_empty() {
                push_unique(&mut keys, name.clone());
            } else {
                for prefix in &self.prefixes {
                    push_unique(&mut keys, format!("{prefix}{name}"));
                }
            }
        }
        keys
    }
}

fn push_unique(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}
