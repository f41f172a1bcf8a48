// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command dispatch table.
//!
//! Every command maps to the action class it is paced under and the action
//! it performs. Static texts come from the `[replies]` config section.

use std::collections::HashMap;

use parley_config::model::RepliesConfig;
use parley_core::ActionClass;

/// What a command does when admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// Answer with a fixed HTML text.
    Static(String),
    /// Delete the caller's conversation history.
    Reset,
}

/// One entry of the [`CommandTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub class: ActionClass,
    pub action: CommandAction,
}

impl Command {
    fn static_text(text: &str) -> Self {
        Self {
            class: ActionClass::Command,
            action: CommandAction::Static(text.to_string()),
        }
    }
}

/// Name to [`Command`] lookup.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    /// Builds the standard table: `start`, `help`, `about`, `policy`, `rules`
    /// and `reset`.
    pub fn from_replies(replies: &RepliesConfig) -> Self {
        let mut table = Self::default();
        table.insert("start", Command::static_text(&replies.start));
        table.insert("help", Command::static_text(&replies.help));
        table.insert("about", Command::static_text(&replies.about));
        table.insert("policy", Command::static_text(&replies.policy));
        table.insert("rules", Command::static_text(&replies.rules));
        table.insert(
            "reset",
            Command {
                class: ActionClass::Command,
                action: CommandAction::Reset,
            },
        );
        table
    }

    /// Adds or replaces a command. Names are stored lowercase.
    pub fn insert(&mut self, name: &str, command: Command) {
        self.commands.insert(name.to_ascii_lowercase(), command);
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Extracts the command name from `text`.
///
/// `"/reset@my_bot extra"` yields `Some("reset")`. Returns `None` when the
/// text is not a slash command.
pub fn parse_command(text: &str) -> Option<&str> {
    let first = text.trim_start().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(name)
}
