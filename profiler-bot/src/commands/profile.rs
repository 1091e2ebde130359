//! Profile display commands: me, preview and file

use profiler_types::ProfileKey;

use super::{CommandContext, CommandError, Invocation, Outcome};
use crate::analytics::AnalyticsEvent;
use crate::render::{self, Owner, RenderTarget};

/// Render the author's own profile to the channel (`me`) or privately (`preview`)
pub async fn execute_own(
    inv: &Invocation,
    ctx: &CommandContext,
    target: RenderTarget,
) -> Result<Outcome, CommandError> {
    let action = match target {
        RenderTarget::Channel => "shared",
        RenderTarget::Author => "previewed",
    };
    let embed = render_for(ctx, inv.key(), &inv.author).await;
    Ok(Outcome::send(
        target,
        embed,
        AnalyticsEvent::profile(&inv.guild_name, &inv.author_tag, action),
    ))
}

/// Send the first mentioned member's profile to the author
pub async fn execute_file(inv: &Invocation, ctx: &CommandContext) -> Result<Outcome, CommandError> {
    let subject = inv
        .mentions
        .first()
        .ok_or_else(|| CommandError::Usage(render::usage(&ctx.prefix, "file")))?;

    let key = ProfileKey::new(inv.guild_id, subject.user_id);
    let embed = render_for(ctx, key, subject).await;
    Ok(Outcome::send(
        RenderTarget::Author,
        embed,
        AnalyticsEvent::profile(&inv.guild_name, &inv.author_tag, "viewed"),
    ))
}

async fn render_for(ctx: &CommandContext, key: ProfileKey, owner: &Owner) -> render::Embed {
    match ctx.store.get(&key).await {
        Ok(profile) => render::render_profile(Ok(&profile), owner),
        Err(e) => {
            log::debug!("Commands: No profile for {}: {}", key, e);
            render::render_profile(Err(&e), owner)
        }
    }
}
