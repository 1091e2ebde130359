//! Prefix command parsing and execution

mod help;
mod list;
mod profile;
mod set_field;

use profiler_types::{ProfileField, ProfileKey};
use std::fmt;

use crate::analytics::AnalyticsEvent;
use crate::render::{Embed, Owner, RenderTarget};
use crate::store::ProfileStore;

/// A command addressed to the bot
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send the command reference privately: `help`
    Help,
    /// Post own profile to the channel: `me`
    Me,
    /// Send own profile privately: `preview`
    Preview,
    /// Send a mentioned member's profile privately: `file @user`
    File,
    /// Send the members with a platform set privately: `list xbox`
    List(String),
    /// Set description, a platform handle or the Steam URL: `xbox HYBR1D HAV0C`
    Set(ProfileField, String),
    /// Prefixed text that matches no command
    Unknown(String),
}

impl Command {
    pub fn name(&self) -> String {
        match self {
            Command::Help => "help".to_string(),
            Command::Me => "me".to_string(),
            Command::Preview => "preview".to_string(),
            Command::File => "file".to_string(),
            Command::List(_) => "list".to_string(),
            Command::Set(field, _) => field.to_string(),
            Command::Unknown(name) => name.clone(),
        }
    }
}

/// Who issued a command and where
#[derive(Debug, Clone)]
pub struct Invocation {
    pub guild_id: u64,
    pub guild_name: String,
    pub author: Owner,
    /// Author tag used for analytics pages, e.g. "name#1234"
    pub author_tag: String,
    /// Users mentioned in the message, in order
    pub mentions: Vec<Owner>,
    /// Avatar of the bot itself, used as the list thumbnail
    pub bot_avatar: Option<String>,
}

impl Invocation {
    pub fn key(&self) -> ProfileKey {
        ProfileKey::new(self.guild_id, self.author.user_id)
    }
}

/// What the channel should deliver for a handled command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to send beyond the acknowledgement reaction
    Ack,
    Send { target: RenderTarget, embed: Embed },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: Reply,
    pub event: Option<AnalyticsEvent>,
}

impl Outcome {
    fn ack() -> Self {
        Self {
            reply: Reply::Ack,
            event: None,
        }
    }

    fn send(target: RenderTarget, embed: Embed, event: AnalyticsEvent) -> Self {
        Self {
            reply: Reply::Send { target, embed },
            event: Some(event),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command name is not one we know
    NotUnderstood(String),
    /// A known command with missing or invalid arguments; carries the usage text
    Usage(String),
    /// The profile store failed
    Store(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::NotUnderstood(name) => write!(f, "Unknown command '{}'", name),
            CommandError::Usage(usage) => f.write_str(usage),
            CommandError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

/// Shared state every command runs against
#[derive(Clone)]
pub struct CommandContext {
    pub store: ProfileStore,
    pub prefix: String,
}

/// Parse a message. Returns None when the text is not addressed to the bot.
///
/// The prefix matches as configured or upper-cased. The first token after it
/// is the command name; the remaining tokens are re-joined with single spaces.
pub fn parse(text: &str, prefix: &str) -> Option<Command> {
    if prefix.is_empty() {
        return None;
    }
    let upper = prefix.to_uppercase();
    let rest = text
        .strip_prefix(prefix)
        .or_else(|| text.strip_prefix(upper.as_str()))?;

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or("").to_lowercase();
    let args = parts.collect::<Vec<_>>().join(" ");

    log::debug!("Commands: Parsed '{}' -> name='{}' args='{}'", text, name, args);

    let command = match name.as_str() {
        "help" => Command::Help,
        "me" => Command::Me,
        "preview" => Command::Preview,
        "file" => Command::File,
        "list" => Command::List(args),
        other => match other.parse::<ProfileField>() {
            Ok(field) => Command::Set(field, args),
            Err(_) => Command::Unknown(name),
        },
    };
    Some(command)
}

/// Execute a command. Every known command first ensures the author's profile exists.
pub async fn execute(
    cmd: Command,
    inv: &Invocation,
    ctx: &CommandContext,
) -> Result<Outcome, CommandError> {
    if let Command::Unknown(name) = cmd {
        return Err(CommandError::NotUnderstood(name));
    }

    let created = ctx
        .store
        .ensure(&inv.key())
        .await
        .map_err(CommandError::Store)?;
    if created {
        log::info!("Commands: New profile {} in guild {}", inv.key(), inv.guild_name);
    }

    match cmd {
        Command::Help => Ok(help::execute(inv, &ctx.prefix)),
        Command::Me => profile::execute_own(inv, ctx, RenderTarget::Channel).await,
        Command::Preview => profile::execute_own(inv, ctx, RenderTarget::Author).await,
        Command::File => profile::execute_file(inv, ctx).await,
        Command::List(args) => list::execute(&args, inv, ctx).await,
        Command::Set(field, value) => set_field::execute(field, &value, inv, ctx).await,
        Command::Unknown(name) => Err(CommandError::NotUnderstood(name)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    pub fn context() -> CommandContext {
        CommandContext {
            store: ProfileStore::from_database(Arc::new(
                Database::new(":memory:").expect("in-memory db"),
            )),
            prefix: "p!".to_string(),
        }
    }

    pub fn owner(user_id: u64, name: &str) -> Owner {
        Owner {
            user_id,
            name: name.to_string(),
            avatar_url: None,
        }
    }

    pub fn invocation(guild_id: u64, user_id: u64) -> Invocation {
        Invocation {
            guild_id,
            guild_name: "Havoc".to_string(),
            author: owner(user_id, "hybridhavoc"),
            author_tag: "hybridhavoc#0001".to_string(),
            mentions: Vec::new(),
            bot_avatar: Some("https://cdn.example/bot.png".to_string()),
        }
    }

    pub async fn run(text: &str, inv: &Invocation, ctx: &CommandContext) -> Result<Outcome, CommandError> {
        let cmd = parse(text, &ctx.prefix).expect("addressed to the bot");
        execute(cmd, inv, ctx).await
    }

    pub fn sent(outcome: &Outcome) -> (RenderTarget, &Embed) {
        match &outcome.reply {
            Reply::Send { target, embed } => (*target, embed),
            Reply::Ack => panic!("expected an embed reply"),
        }
    }
}
