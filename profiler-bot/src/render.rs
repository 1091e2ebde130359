//! Formatting of profiles, member lists and help into embed documents.
//!
//! Documents are plain data so they can be built and tested without a
//! Discord connection; `channels::discord` converts them at send time.

use chrono::{DateTime, Utc};
use profiler_types::{Platform, Profile, ProfileField};

pub const FOOTER: &str = "Developed by hybridhavoc";
pub const NO_DESCRIPTION: &str = "This user has not provided a description yet.";

/// Discord embed limits, counted in characters
pub const FIELD_NAME_LIMIT: usize = 256;
pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const EMBED_TOTAL_LIMIT: usize = 6000;
const FIELDS_PER_EMBED: usize = 25;

const ABOUT: &str = "This bot allows you to store and share your gaming profiles with other \
    Discord members. It is server-specific so if you want to share different profiles on \
    different servers you can.";

/// Where a rendered document should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The channel the command was issued in
    Channel,
    /// A direct message to the command author
    Author,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral rich message document
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub author: Option<String>,
    pub title: String,
    pub thumbnail: Option<String>,
    pub description: String,
    pub fields: Vec<EmbedField>,
    pub footer: String,
    pub timestamp: DateTime<Utc>,
}

impl Embed {
    fn new(title: impl Into<String>) -> Self {
        Self {
            author: None,
            title: title.into(),
            thumbnail: None,
            description: String::new(),
            fields: Vec::new(),
            footer: FOOTER.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: clamp(&name.into(), FIELD_NAME_LIMIT),
            value: clamp(&value.into(), FIELD_VALUE_LIMIT),
            inline,
        });
        self
    }

    /// Characters Discord counts toward the total embed size
    pub fn total_chars(&self) -> usize {
        self.title.chars().count()
            + self.description.chars().count()
            + self.footer.chars().count()
            + self.author.as_deref().map_or(0, |a| a.chars().count())
            + self.fields.iter().map(EmbedField::chars).sum::<usize>()
    }

    /// Move fields that would push this embed past the size limits onto
    /// additional field-only embeds.
    fn spill_fields(mut self) -> Vec<Embed> {
        let fields = std::mem::take(&mut self.fields);
        let mut pages = vec![self];
        for field in fields {
            let Some(last) = pages.last_mut() else { break };
            let fits = last.fields.len() < FIELDS_PER_EMBED
                && last.total_chars() + field.chars() <= EMBED_TOTAL_LIMIT;
            if fits || (last.fields.is_empty() && last.description.is_empty()) {
                last.fields.push(field);
            } else {
                let mut next = last.clone();
                next.description = String::new();
                next.fields = vec![field];
                pages.push(next);
            }
        }
        pages
    }

    /// Split an over-long description across several embeds. Breaks fall on
    /// line boundaries where possible; fields stay on the first page.
    pub fn paginate(&self, limit: usize) -> Vec<Embed> {
        if self.description.chars().count() <= limit || limit == 0 {
            return self.clone().spill_fields();
        }

        let mut pages: Vec<String> = Vec::new();
        let mut current = String::new();
        for line in self.description.lines() {
            let mut line = line;
            loop {
                let needed = line.chars().count() + usize::from(!current.is_empty());
                if current.chars().count() + needed <= limit {
                    if !current.is_empty() {
                        current.push('\n');
                    }
                    current.push_str(line);
                    break;
                }
                if !current.is_empty() {
                    pages.push(std::mem::take(&mut current));
                    continue;
                }
                // A single line longer than the limit is hard-split on a char boundary
                let cut = line
                    .char_indices()
                    .nth(limit)
                    .map(|(i, _)| i)
                    .unwrap_or(line.len());
                pages.push(line[..cut].to_string());
                line = &line[cut..];
            }
        }
        if !current.is_empty() {
            pages.push(current);
        }

        pages
            .into_iter()
            .enumerate()
            .flat_map(|(i, description)| {
                let mut page = self.clone();
                page.description = description;
                if i > 0 {
                    page.fields.clear();
                }
                page.spill_fields()
            })
            .collect()
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl EmbedField {
    fn chars(&self) -> usize {
        self.name.chars().count() + self.value.chars().count()
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis
fn clamp(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Display identity of a profile owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Markdown for one platform entry: a link when one can be built, else plain text.
///
/// Steam links only through the profile's own steamurl override. A link that
/// would not fit in one field value falls back to the plain handle.
pub fn platform_entry(profile: &Profile, platform: Platform, handle: &str) -> String {
    let url = match platform {
        Platform::Steam => profile.get(ProfileField::SteamUrl).map(str::to_string),
        other => other.profile_url(handle),
    };
    match url {
        Some(url) if handle.chars().count() + url.chars().count() + 4 <= FIELD_VALUE_LIMIT => {
            format!("[{}]({})", handle, url)
        }
        _ => clamp(handle, FIELD_VALUE_LIMIT),
    }
}

/// Render a profile lookup. A failed lookup becomes a "No profile yet" document.
pub fn render_profile(lookup: Result<&Profile, &str>, owner: &Owner) -> Embed {
    let profile = match lookup {
        Ok(p) => p,
        Err(e) => {
            let mut embed = Embed::new("No profile yet").field("Error", e, false);
            embed.description = "This user does not yet have a profile.".to_string();
            return embed;
        }
    };

    let mut embed = Embed::new("Profile");
    embed.author = Some(owner.name.clone());
    embed.thumbnail = owner.avatar_url.clone();
    embed.description = profile
        .get(ProfileField::Description)
        .unwrap_or(NO_DESCRIPTION)
        .to_string();

    for (platform, handle) in profile.present_handles() {
        let value = platform_entry(profile, platform, handle);
        embed = embed.field(platform.label(), value, true);
    }
    embed
}

/// Render the member list for one platform. Each line mentions the owner.
pub fn render_list(platform: Platform, profiles: &[Profile], thumbnail: Option<String>) -> Embed {
    let mut embed = Embed::new(format!("{} Members", platform.to_string().to_uppercase()));
    embed.thumbnail = thumbnail;

    let lines: Vec<String> = profiles
        .iter()
        .filter_map(|p| {
            p.get(ProfileField::Handle(platform)).map(|handle| {
                format!(
                    "<@{}>\t:\t{}",
                    p.key.user_id,
                    platform_entry(p, platform, handle)
                )
            })
        })
        .collect();

    embed.description = if lines.is_empty() {
        format!("Nobody has shared a {} handle yet.", platform.label())
    } else {
        lines.join("\n")
    };
    embed
}

/// Render the command reference
pub fn render_help(prefix: &str) -> Embed {
    let p = prefix;
    let commands = format!(
        "**{p}me**\n\
        Post a copy of your profile to the channel you're in.\n\n\
        **{p}preview**\n\
        Get a copy of your profile sent to you in a private message.\n\n\
        **{p}file**\n\
        Have a copy of somebody's profile sent to you in a private message. Just tag the user after the command.\n\
        ```Example: {p}file @hybridhavoc```\n\
        **{p}list**\n\
        Get a list of users on the specified platform sent to you in a private message. See the list of supported platforms below.\n\
        ```Example: {p}list xbox```\n\
        **{p}description**\n\
        Allows the user to supply a description. Think of this as their biography.\n\
        ```Example: {p}description Just an awesome gamer playing awesome games```\n\n\
        **{p}[*platform*]**\n\
        Allows the user to supply a platform gamertag to add to their profile. See the list of supported platforms below.\n\
        ```Example: {p}xbox HYBR1D HAV0C```\n\
        **{p}steamurl**\n\
        Steam profile names don't always resolve to a page, so use this command to provide the URL to your Steam profile."
    );

    let platforms: Vec<String> = Platform::all().map(|p| p.to_string()).collect();

    let mut embed = Embed::new("Profiler Help")
        .field("Commands", commands, false)
        .field(
            "Supported Platforms",
            format!("```\n{}```", platforms.join("\n")),
            false,
        )
        .field(
            "Get the Bot",
            "[Developer Site](https://www.hybridhavoc.com/2019/02/04/profiler/)",
            false,
        )
        .field(
            "Icon",
            "Icons made by [Nikita Golubev](https://www.flaticon.com/authors/nikita-golubev) \
            from [www.flaticon.com](https://www.flaticon.com/) is licensed by \
            [CC 3.0 BY](http://creativecommons.org/licenses/by/3.0/)",
            false,
        );
    embed.description = ABOUT.to_string();
    embed
}

/// Usage text for a malformed command
pub fn usage(prefix: &str, command: &str) -> String {
    match command {
        "file" => format!(
            "Tag the member whose profile you want, e.g. `{}file @hybridhavoc`",
            prefix
        ),
        "list" => {
            let platforms: Vec<String> = Platform::all().map(|p| p.to_string()).collect();
            format!(
                "Name a platform to list, e.g. `{}list xbox`. Supported: {}",
                prefix,
                platforms.join(", ")
            )
        }
        other => format!("Try `{}help` for how to use `{}{}`", prefix, prefix, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiler_types::ProfileKey;
    use std::collections::BTreeMap;

    fn profile(user_id: u64) -> Profile {
        Profile {
            key: ProfileKey::new(1, user_id),
            description: None,
            handles: BTreeMap::new(),
            steam_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn owner() -> Owner {
        Owner {
            user_id: 42,
            name: "hybridhavoc".to_string(),
            avatar_url: Some("https://cdn.example/avatar.png".to_string()),
        }
    }

    #[test]
    fn test_description_placeholder() {
        let embed = render_profile(Ok(&profile(42)), &owner());
        assert_eq!(embed.title, "Profile");
        assert_eq!(embed.author.as_deref(), Some("hybridhavoc"));
        assert_eq!(embed.thumbnail.as_deref(), Some("https://cdn.example/avatar.png"));
        assert_eq!(embed.description, NO_DESCRIPTION);
        assert!(embed.fields.is_empty());
        assert_eq!(embed.footer, FOOTER);
    }

    #[test]
    fn test_description_verbatim() {
        let mut p = profile(42);
        p.description = Some("Just an awesome gamer playing awesome games".to_string());
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(embed.description, "Just an awesome gamer playing awesome games");
    }

    #[test]
    fn test_empty_description_uses_placeholder() {
        let mut p = profile(42);
        p.description = Some(String::new());
        assert_eq!(render_profile(Ok(&p), &owner()).description, NO_DESCRIPTION);
    }

    #[test]
    fn test_handle_with_spaces_is_encoded() {
        let mut p = profile(42);
        p.handles.insert(Platform::Xbox, "HYBR1D HAV0C".to_string());
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(
            embed.field_value("Xbox"),
            Some("[HYBR1D HAV0C](https://account.xbox.com/en-us/profile?gamertag=HYBR1D%20HAV0C)")
        );
        assert!(embed.fields[0].inline);
    }

    #[test]
    fn test_steam_plain_without_url() {
        let mut p = profile(42);
        p.handles.insert(Platform::Steam, "hybridhavoc".to_string());
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(embed.field_value("Steam"), Some("hybridhavoc"));
    }

    #[test]
    fn test_steam_links_to_override() {
        let mut p = profile(42);
        p.handles.insert(Platform::Steam, "hybridhavoc".to_string());
        p.steam_url = Some("https://steamcommunity.com/id/hh".to_string());
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(
            embed.field_value("Steam"),
            Some("[hybridhavoc](https://steamcommunity.com/id/hh)")
        );
    }

    #[test]
    fn test_plain_text_platforms() {
        let mut p = profile(42);
        p.handles.insert(Platform::Switch, "SW-1234-5678-9012".to_string());
        p.handles.insert(Platform::Bnet, "hh#1234".to_string());
        p.handles.insert(Platform::Origin, "hh_origin".to_string());
        p.handles.insert(Platform::Epic, "hh epic".to_string());
        p.handles.insert(Platform::Rocketid, "hh:rl".to_string());
        let embed = render_profile(Ok(&p), &owner());

        assert_eq!(embed.field_value("Nintendo Switch"), Some("SW-1234-5678-9012"));
        assert_eq!(embed.field_value("Battle.net"), Some("hh#1234"));
        assert_eq!(embed.field_value("EA Origin"), Some("hh_origin"));
        assert_eq!(embed.field_value("Epic Games"), Some("hh epic"));
        assert_eq!(embed.field_value("Rocket ID"), Some("hh:rl"));
    }

    #[test]
    fn test_fields_follow_platform_order() {
        let mut p = profile(42);
        p.handles.insert(Platform::Gog, "g".to_string());
        p.handles.insert(Platform::Xbox, "x".to_string());
        p.handles.insert(Platform::Psn, String::new());
        let embed = render_profile(Ok(&p), &owner());
        let names: Vec<&str> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Xbox", "GOG"]);
    }

    #[test]
    fn test_missing_profile_document() {
        let embed = render_profile(Err("Profile not found: 1-42"), &owner());
        assert_eq!(embed.title, "No profile yet");
        assert_eq!(embed.description, "This user does not yet have a profile.");
        assert_eq!(embed.field_value("Error"), Some("Profile not found: 1-42"));
        assert!(embed.author.is_none());
        assert_eq!(embed.footer, FOOTER);
    }

    #[test]
    fn test_list_lines() {
        let mut a = profile(1);
        a.handles.insert(Platform::Psn, "first one".to_string());
        let mut b = profile(2);
        b.handles.insert(Platform::Psn, "second".to_string());

        let embed = render_list(Platform::Psn, &[a, b], None);
        assert_eq!(embed.title, "PSN Members");
        assert_eq!(
            embed.description,
            "<@1>\t:\t[first one](https://my.playstation.com/profile/first%20one)\n\
             <@2>\t:\t[second](https://my.playstation.com/profile/second)"
        );
    }

    #[test]
    fn test_list_steam_uses_override_rule() {
        let mut a = profile(1);
        a.handles.insert(Platform::Steam, "linked".to_string());
        a.steam_url = Some("https://steamcommunity.com/id/linked".to_string());
        let mut b = profile(2);
        b.handles.insert(Platform::Steam, "plain".to_string());

        let embed = render_list(Platform::Steam, &[a, b], None);
        assert_eq!(
            embed.description,
            "<@1>\t:\t[linked](https://steamcommunity.com/id/linked)\n<@2>\t:\tplain"
        );
    }

    #[test]
    fn test_empty_list() {
        let embed = render_list(Platform::Gog, &[profile(1)], Some("thumb".to_string()));
        assert_eq!(embed.description, "Nobody has shared a GOG handle yet.");
        assert_eq!(embed.thumbnail.as_deref(), Some("thumb"));
    }

    #[test]
    fn test_help_mentions_prefix_and_platforms() {
        let embed = render_help("p!");
        assert_eq!(embed.title, "Profiler Help");
        let commands = embed.field_value("Commands").unwrap();
        assert!(commands.contains("**p!me**"));
        assert!(commands.contains("p!xbox HYBR1D HAV0C"));
        let platforms = embed.field_value("Supported Platforms").unwrap();
        for p in Platform::all() {
            assert!(platforms.contains(&p.to_string()));
        }
    }

    #[test]
    fn test_paginate_short_description_is_single_page() {
        let embed = render_help("p!");
        assert_eq!(embed.paginate(4096), vec![embed.clone()]);
    }

    #[test]
    fn test_paginate_splits_on_lines() {
        let profiles: Vec<Profile> = (1..=5)
            .map(|id| {
                let mut p = profile(id);
                p.handles.insert(Platform::Epic, "x".repeat(10));
                p
            })
            .collect();
        let embed = render_list(Platform::Epic, &profiles, None);
        // Each line is "<@N>\t:\txxxxxxxxxx", 17 chars
        let pages = embed.paginate(40);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.description.chars().count() <= 40));
        assert!(pages.iter().all(|p| p.title == "EPIC Members"));
        let joined: Vec<&str> = pages.iter().map(|p| p.description.as_str()).collect();
        assert_eq!(joined.join("\n"), embed.description);
    }

    #[test]
    fn test_paginate_hard_splits_long_lines() {
        let mut embed = render_help("p!");
        embed.description = "é".repeat(25);
        let pages = embed.paginate(10);
        let sizes: Vec<usize> = pages.iter().map(|p| p.description.chars().count()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert!(!pages[0].fields.is_empty());
        assert!(pages[1].fields.is_empty());
    }

    #[test]
    fn test_oversized_handle_fits_one_field() {
        let mut p = profile(42);
        p.handles.insert(Platform::Xbox, "a b".repeat(600));
        let embed = render_profile(Ok(&p), &owner());

        let value = embed.field_value("Xbox").unwrap();
        assert_eq!(value.chars().count(), FIELD_VALUE_LIMIT);
        assert!(value.starts_with("a b"));
        assert!(value.ends_with('…'));
    }

    #[test]
    fn test_link_kept_when_it_fits() {
        let mut p = profile(42);
        p.handles.insert(Platform::Gog, "g".repeat(400));
        let embed = render_profile(Ok(&p), &owner());
        assert!(embed.field_value("GOG").unwrap().starts_with("[ggg"));

        p.handles.insert(Platform::Gog, "g".repeat(1000));
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(embed.field_value("GOG").unwrap(), "g".repeat(1000));
    }

    #[test]
    fn test_paginate_spills_fields_past_total_limit() {
        let mut p = profile(42);
        for platform in Platform::all() {
            p.handles.insert(platform, "h".repeat(1500));
        }
        let embed = render_profile(Ok(&p), &owner());
        assert_eq!(embed.fields.len(), 10);

        let pages = embed.paginate(4096);
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|page| page.total_chars() <= EMBED_TOTAL_LIMIT));
        assert_eq!(pages[0].description, NO_DESCRIPTION);
        assert!(pages[1..].iter().all(|page| page.description.is_empty()));

        let names: Vec<&str> = pages
            .iter()
            .flat_map(|page| page.fields.iter().map(|f| f.name.as_str()))
            .collect();
        let expected: Vec<&str> = Platform::all().map(|p| p.label()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_usage_messages() {
        assert!(usage("p!", "file").contains("p!file @"));
        assert!(usage("p!", "list").contains("rocketid"));
    }
}
