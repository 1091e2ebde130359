//! List command - members of the guild with a platform set

use profiler_types::Platform;

use super::{CommandContext, CommandError, Invocation, Outcome};
use crate::analytics::AnalyticsEvent;
use crate::render::{self, RenderTarget};

pub async fn execute(
    args: &str,
    inv: &Invocation,
    ctx: &CommandContext,
) -> Result<Outcome, CommandError> {
    let platform = args
        .split_whitespace()
        .next()
        .and_then(|name| name.parse::<Platform>().ok())
        .ok_or_else(|| CommandError::Usage(render::usage(&ctx.prefix, "list")))?;

    let profiles = ctx
        .store
        .filter(inv.guild_id, platform)
        .await
        .map_err(CommandError::Store)?;
    log::debug!(
        "Commands: {} members with {} in guild {}",
        profiles.len(),
        platform,
        inv.guild_id
    );

    Ok(Outcome::send(
        RenderTarget::Author,
        render::render_list(platform, &profiles, inv.bot_avatar.clone()),
        AnalyticsEvent::list(&inv.guild_name, &platform.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_list_only_includes_guild_members_with_platform() {
        let ctx = context();
        run("p!xbox HYBR1D HAV0C", &invocation(1, 1), &ctx).await.unwrap();
        run("p!psn not-xbox", &invocation(1, 2), &ctx).await.unwrap();
        run("p!xbox elsewhere", &invocation(2, 3), &ctx).await.unwrap();
        run("p!xbox second", &invocation(1, 4), &ctx).await.unwrap();

        let outcome = run("p!list xbox", &invocation(1, 2), &ctx).await.unwrap();
        let (target, embed) = sent(&outcome);
        assert_eq!(target, RenderTarget::Author);
        assert_eq!(embed.title, "XBOX Members");
        assert_eq!(embed.thumbnail.as_deref(), Some("https://cdn.example/bot.png"));
        assert_eq!(
            embed.description,
            "<@1>\t:\t[HYBR1D HAV0C](https://account.xbox.com/en-us/profile?gamertag=HYBR1D%20HAV0C)\n\
             <@4>\t:\t[second](https://account.xbox.com/en-us/profile?gamertag=second)"
        );
        assert_eq!(outcome.event, Some(AnalyticsEvent::list("Havoc", "xbox")));
    }

    #[tokio::test]
    async fn test_list_platform_is_case_insensitive() {
        let ctx = context();
        let outcome = run("p!list Switch", &invocation(1, 1), &ctx).await.unwrap();
        assert_eq!(sent(&outcome).1.title, "SWITCH Members");
    }

    #[tokio::test]
    async fn test_list_requires_known_platform() {
        let ctx = context();
        for text in ["p!list", "p!list myspace"] {
            let err = run(text, &invocation(1, 1), &ctx).await.unwrap_err();
            assert!(matches!(err, CommandError::Usage(ref u) if u.contains("p!list xbox")));
        }
    }
}
