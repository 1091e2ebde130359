use serenity::all::{
    ActivityData, ChannelId, Client, Context, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter,
    CreateMessage, EventHandler, GatewayIntents, Guild, Message, MessageId, Ready, Timestamp,
    UnavailableGuild,
};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::reconnect::ReconnectPolicy;
use crate::analytics::{Analytics, AnalyticsEvent};
use crate::commands::{self, CommandContext, CommandError, Invocation, Outcome, Reply};
use crate::config::ReconnectConfig;
use crate::render::{Embed, Owner, RenderTarget};

/// Discord caps embed descriptions at 4096 characters
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// A session that stays up this long resets the reconnect policy
const HEALTHY_SESSION: Duration = Duration::from_secs(120);

const ACK: char = '☑';
const FAILED: char = '❌';
const CONFUSED: char = '❓';

const DM_REJECTION: &str = "You can't talk to me here";

/// Convert a rendered document into a serenity embed
fn to_discord_embed(embed: &Embed) -> CreateEmbed {
    let mut out = CreateEmbed::new()
        .title(&embed.title)
        .footer(CreateEmbedFooter::new(&embed.footer));

    // Field-only pages carry no description
    if !embed.description.is_empty() {
        out = out.description(&embed.description);
    }
    if let Some(author) = &embed.author {
        out = out.author(CreateEmbedAuthor::new(author));
    }
    if let Some(thumbnail) = &embed.thumbnail {
        out = out.thumbnail(thumbnail);
    }
    for field in &embed.fields {
        out = out.field(&field.name, &field.value, field.inline);
    }
    if let Ok(ts) = Timestamp::from_unix_timestamp(embed.timestamp.timestamp()) {
        out = out.timestamp(ts);
    }
    out
}

/// How an inbound message is routed before any command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Bots, including ourselves
    Ignore,
    /// Direct messages have no guild to scope a profile to
    RejectDirect,
    Guild(u64),
}

fn gate(author_is_bot: bool, guild_id: Option<u64>) -> Gate {
    match (author_is_bot, guild_id) {
        (true, _) => Gate::Ignore,
        (false, None) => Gate::RejectDirect,
        (false, Some(id)) => Gate::Guild(id),
    }
}

/// Channel-side response to a handled command
#[derive(Debug, Clone, PartialEq, Eq)]
struct Disposition {
    /// Plain text posted to the channel
    say: Option<String>,
    reactions: Vec<char>,
    /// The triggering message is always removed after this delay
    delete_after: Duration,
}

fn disposition(result: &Result<Outcome, CommandError>, delete_delay: Duration) -> Disposition {
    let (say, reactions) = match result {
        Ok(_) => (None, vec![ACK]),
        Err(CommandError::NotUnderstood(_)) => (None, vec![FAILED, CONFUSED]),
        Err(CommandError::Usage(usage)) => (Some(usage.clone()), vec![FAILED]),
        Err(CommandError::Store(_)) => (None, vec![FAILED]),
    };
    Disposition {
        say,
        reactions,
        delete_after: delete_delay,
    }
}

fn owner_of(user: &serenity::all::User) -> Owner {
    Owner {
        user_id: user.id.get(),
        name: user.name.clone(),
        avatar_url: user.avatar_url(),
    }
}

#[derive(Clone)]
pub struct ProfilerHandler {
    commands: CommandContext,
    analytics: Analytics,
    delete_delay: Duration,
}

impl ProfilerHandler {
    pub fn new(commands: CommandContext, analytics: Analytics, delete_delay: Duration) -> Self {
        Self {
            commands,
            analytics,
            delete_delay,
        }
    }

    /// Delete the triggering message once the delay has passed
    fn schedule_delete(
        &self,
        ctx: &Context,
        channel_id: ChannelId,
        message_id: MessageId,
        delay: Duration,
    ) {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = channel_id.delete_message(&ctx, message_id).await {
                log::warn!("Discord: Failed to delete message {}: {}", message_id, e);
            }
        });
    }

    async fn react(&self, ctx: &Context, msg: &Message, reaction: char) {
        if let Err(e) = msg.react(ctx, reaction).await {
            log::warn!("Discord: Failed to react {} to {}: {}", reaction, msg.id, e);
        }
    }

    async fn deliver(&self, ctx: &Context, msg: &Message, target: RenderTarget, embed: &Embed) {
        for page in embed.paginate(EMBED_DESCRIPTION_LIMIT) {
            let builder = CreateMessage::new().embed(to_discord_embed(&page));
            let result = match target {
                RenderTarget::Channel => msg.channel_id.send_message(ctx, builder).await,
                RenderTarget::Author => msg.author.direct_message(ctx, builder).await,
            };
            if let Err(e) = result {
                log::error!(
                    "Discord: Failed to send '{}' to {:?} for {}: {}",
                    embed.title,
                    target,
                    msg.author.name,
                    e
                );
                return;
            }
        }
    }

    fn invocation(&self, ctx: &Context, msg: &Message, guild_id: u64) -> Invocation {
        let guild_name = msg
            .guild(&ctx.cache)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| guild_id.to_string());

        Invocation {
            guild_id,
            guild_name,
            author: owner_of(&msg.author),
            author_tag: msg.author.tag(),
            mentions: msg.mentions.iter().map(owner_of).collect(),
            bot_avatar: ctx.cache.current_user().avatar_url(),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for ProfilerHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        let guild_id = match gate(msg.author.bot, msg.guild_id.map(|g| g.get())) {
            Gate::Ignore => return,
            Gate::RejectDirect => {
                log::debug!("Discord: Rejecting direct message from {}", msg.author.name);
                if let Err(e) = msg.channel_id.say(&ctx, DM_REJECTION).await {
                    log::warn!("Discord: Failed to reply to direct message: {}", e);
                }
                return;
            }
            Gate::Guild(id) => id,
        };

        let Some(cmd) = commands::parse(&msg.content, &self.commands.prefix) else {
            return;
        };

        log::info!(
            "Discord: '{}' from {} ({}) in guild {}",
            cmd.name(),
            msg.author.name,
            msg.author.id,
            guild_id
        );

        let inv = self.invocation(&ctx, &msg, guild_id);
        let result = commands::execute(cmd, &inv, &self.commands).await;
        let plan = disposition(&result, self.delete_delay);

        match result {
            Ok(outcome) => {
                if let Reply::Send { target, embed } = &outcome.reply {
                    self.deliver(&ctx, &msg, *target, embed).await;
                }
                if let Some(event) = outcome.event {
                    self.analytics.emit(event);
                }
            }
            Err(CommandError::NotUnderstood(name)) => {
                log::debug!("Discord: Didn't understand command '{}'", name);
            }
            Err(CommandError::Usage(_)) => {}
            Err(e @ CommandError::Store(_)) => {
                log::error!("Discord: Command from {} failed: {}", msg.author.name, e);
            }
        }

        if let Some(text) = &plan.say {
            if let Err(e) = msg.channel_id.say(&ctx, text).await {
                log::warn!("Discord: Failed to send usage hint: {}", e);
            }
        }
        for reaction in plan.reactions {
            self.react(&ctx, &msg, reaction).await;
        }
        self.schedule_delete(&ctx, msg.channel_id, msg.id, plan.delete_after);
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        let prefix = &self.commands.prefix;
        ctx.set_activity(Some(ActivityData::listening(format!("{}help for help", prefix))));

        log::info!("Discord: Connected");
        log::info!("Discord: Logged in as {} ({})", ready.user.name, ready.user.id);
        log::info!("Discord: Prefix is [{}]", prefix);

        self.analytics.emit(AnalyticsEvent::login());
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, is_new: Option<bool>) {
        // Startup replays every known guild; only count real joins
        if is_new == Some(true) {
            log::info!("Discord: Joined guild {} ({})", guild.name, guild.id);
            self.analytics.emit(AnalyticsEvent::guild_added(&guild.name));
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, full: Option<Guild>) {
        if incomplete.unavailable {
            // Outage, not a removal
            return;
        }
        let name = full
            .map(|g| g.name)
            .unwrap_or_else(|| incomplete.id.to_string());
        log::info!("Discord: Left guild {} ({})", name, incomplete.id);
        self.analytics.emit(AnalyticsEvent::guild_deleted(&name));
    }
}

enum SessionEnd {
    Shutdown,
    Stopped,
    Failed(String),
}

async fn run_session(
    token: &str,
    handler: ProfilerHandler,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    // Message content is needed to read prefix commands
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match Client::builder(token, intents).event_handler(handler).await {
        Ok(c) => c,
        Err(e) => return SessionEnd::Failed(format!("Failed to create Discord client: {}", e)),
    };
    log::info!("Discord: Client created successfully");

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        _ = shutdown_rx => {
            log::info!("Discord: Received shutdown signal");
            shard_manager.shutdown_all().await;
            SessionEnd::Shutdown
        }
        result = client.start() => match result {
            Ok(()) => SessionEnd::Stopped,
            Err(e) => SessionEnd::Failed(format!("Discord client error: {}", e)),
        }
    }
}

/// Run the bot until shutdown, restarting the gateway session with backoff
pub async fn start_discord_listener(
    token: String,
    reconnect: ReconnectConfig,
    handler: ProfilerHandler,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    log::info!("Discord: Token length = {}", token.len());
    let mut policy = ReconnectPolicy::new(&reconnect);

    loop {
        let started = Instant::now();
        match run_session(&token, handler.clone(), &mut shutdown_rx).await {
            SessionEnd::Shutdown => {
                log::info!("Discord: Listener stopped");
                return;
            }
            SessionEnd::Stopped => log::warn!("Discord: Session ended unexpectedly"),
            SessionEnd::Failed(e) => log::error!("{}", e),
        }

        if started.elapsed() >= HEALTHY_SESSION {
            policy.on_healthy();
        }
        let delay = policy.on_failure(Instant::now());
        log::warn!(
            "Discord: Reconnecting in {}s ({} consecutive failures)",
            delay.as_secs(),
            policy.consecutive_failures()
        );

        tokio::select! {
            _ = &mut shutdown_rx => {
                log::info!("Discord: Shutdown during reconnect wait");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
