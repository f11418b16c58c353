use std::collections::HashMap;

use crate::domain::{Deadline, ItemId};
use crate::error::OrderError;
use crate::notify::text;

/// A validated chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    OpenOrder { deadline: Deadline, title: String },
    CloseOrder,
    AddItem { quantity: i64, name: String },
    PickItemToRemove,
}

/// A pressed option of a removal picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    RemoveItem(ItemId),
    AbandonRemoval,
}

/// Turns the arguments after the command token into a [`Command`].
type Parser = fn(&[&str]) -> Result<Command, OrderError>;

struct CommandEntry {
    names: &'static [&'static str],
    parse: Parser,
}

const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        names: &["/start", "/help"],
        parse: parse_help,
    },
    CommandEntry {
        names: &["/takeorders", "/takeorder", "/neworder", "/neworders"],
        parse: parse_open,
    },
    CommandEntry {
        names: &["/endorders", "/endorder", "/endtakeorders", "/endtakeorder"],
        parse: parse_close,
    },
    CommandEntry {
        names: &["/order"],
        parse: parse_add,
    },
    CommandEntry {
        names: &["/cancelorder", "/removeorder"],
        parse: parse_pick,
    },
];

fn parse_help(_: &[&str]) -> Result<Command, OrderError> {
    Ok(Command::Help)
}

fn parse_close(_: &[&str]) -> Result<Command, OrderError> {
    Ok(Command::CloseOrder)
}

fn parse_pick(_: &[&str]) -> Result<Command, OrderError> {
    Ok(Command::PickItemToRemove)
}

/// `<HH:MM> <title…>`
fn parse_open(args: &[&str]) -> Result<Command, OrderError> {
    let [deadline, title @ ..] = args else {
        return Err(OrderError::InvalidInput(text::OPEN_INVALID_FORMAT.to_string()));
    };
    if title.is_empty() {
        return Err(OrderError::InvalidInput(text::OPEN_INVALID_FORMAT.to_string()));
    }

    let deadline = deadline
        .parse::<Deadline>()
        .map_err(|_| OrderError::InvalidInput(text::OPEN_INVALID_TIME.to_string()))?;
    Ok(Command::OpenOrder {
        deadline,
        title: title.join(" "),
    })
}

/// `<quantity> <name…>`
fn parse_add(args: &[&str]) -> Result<Command, OrderError> {
    let [quantity, name @ ..] = args else {
        return Err(OrderError::InvalidInput(text::ADD_INVALID_FORMAT.to_string()));
    };
    if name.is_empty() {
        return Err(OrderError::InvalidInput(text::ADD_INVALID_FORMAT.to_string()));
    }

    let quantity = quantity
        .parse::<i64>()
        .ok()
        .filter(|quantity| *quantity > 0)
        .ok_or_else(|| OrderError::InvalidInput(text::ADD_INVALID_QUANTITY.to_string()))?;
    Ok(Command::AddItem {
        quantity,
        name: name.join(" "),
    })
}

/// Alias table lookup for inbound text.
pub struct CommandRegistry {
    parsers: HashMap<&'static str, Parser>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let parsers = COMMANDS
            .iter()
            .flat_map(|spec| spec.names.iter().map(move |name| (*name, spec.parse)))
            .collect();
        Self { parsers }
    }

    /// `None` when the text is not a known command. The command token is
    /// case-insensitive and may carry an `@botname` suffix.
    pub fn parse(&self, text: &str) -> Option<Result<Command, OrderError>> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let (first, args) = tokens.split_first()?;
        let parse = self.parsers.get(command_name(first).as_str())?;
        Some(parse(args))
    }

    pub fn parse_callback(&self, data: &str) -> Option<Result<Callback, OrderError>> {
        let tokens: Vec<&str> = data.split_whitespace().collect();
        let (first, args) = tokens.split_first()?;
        match command_name(first).as_str() {
            "/delete" => Some(
                args.first()
                    .and_then(|id| id.parse::<ItemId>().ok())
                    .map(Callback::RemoveItem)
                    .ok_or_else(|| OrderError::InvalidInput(text::INVALID_ITEM.to_string())),
            ),
            "/cancel" => Some(Ok(Callback::AbandonRemoval)),
            _ => None,
        }
    }
}

fn command_name(token: &str) -> String {
    token.split('@').next().unwrap_or(token).to_lowercase()
}
