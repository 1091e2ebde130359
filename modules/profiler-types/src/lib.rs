//! Shared types for the profiler bot and its store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

// =====================================================
// Platforms
// =====================================================

/// Gaming platforms a profile can carry a handle for.
///
/// Declaration order is the order fields appear on a rendered profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    IntoStaticStr,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    Xbox,
    Psn,
    Steam,
    Uplay,
    Gog,
    Switch,
    Bnet,
    Origin,
    Epic,
    Rocketid,
}

/// One row of the platform table: display label and optional profile URL prefix.
struct PlatformInfo {
    label: &'static str,
    url_prefix: Option<&'static str>,
}

impl Platform {
    fn info(self) -> PlatformInfo {
        let (label, url_prefix) = match self {
            Platform::Xbox => ("Xbox", Some("https://account.xbox.com/en-us/profile?gamertag=")),
            Platform::Psn => ("Playstation", Some("https://my.playstation.com/profile/")),
            // linked through the steamurl override instead
            Platform::Steam => ("Steam", None),
            Platform::Uplay => ("Uplay", Some("https://club.ubisoft.com/en-US/profile/")),
            Platform::Gog => ("GOG", Some("https://www.gog.com/u/")),
            Platform::Switch => ("Nintendo Switch", None),
            Platform::Bnet => ("Battle.net", None),
            Platform::Origin => ("EA Origin", None),
            Platform::Epic => ("Epic Games", None),
            Platform::Rocketid => ("Rocket ID", None),
        };
        PlatformInfo { label, url_prefix }
    }

    /// Human readable name, e.g. "Nintendo Switch"
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Public profile URL for a handle, if the platform has one.
    /// The handle is percent-encoded (spaces become `%20`).
    pub fn profile_url(self, handle: &str) -> Option<String> {
        self.info()
            .url_prefix
            .map(|prefix| format!("{}{}", prefix, urlencoding::encode(handle)))
    }

    /// All platforms in display order
    pub fn all() -> impl Iterator<Item = Platform> {
        Platform::iter()
    }
}

// =====================================================
// Fields
// =====================================================

/// A settable field of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Description,
    Handle(Platform),
    SteamUrl,
}

impl ProfileField {
    /// Storage column / command name for this field
    pub fn name(self) -> &'static str {
        match self {
            ProfileField::Description => "description",
            ProfileField::SteamUrl => "steamurl",
            ProfileField::Handle(p) => p.into(),
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "description" => Ok(ProfileField::Description),
            "steamurl" => Ok(ProfileField::SteamUrl),
            other => other
                .parse::<Platform>()
                .map(ProfileField::Handle)
                .map_err(|_| format!("Unknown profile field: {}", s)),
        }
    }
}

// =====================================================
// Keys
// =====================================================

/// Composite record key: one profile per (guild, user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub guild_id: u64,
    pub user_id: u64,
}

impl ProfileKey {
    pub fn new(guild_id: u64, user_id: u64) -> Self {
        Self { guild_id, user_id }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.guild_id, self.user_id)
    }
}

impl FromStr for ProfileKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (guild, user) = s
            .split_once('-')
            .ok_or_else(|| format!("Malformed profile key: {}", s))?;
        let guild_id = guild
            .parse()
            .map_err(|_| format!("Malformed guild id in key: {}", s))?;
        let user_id = user
            .parse()
            .map_err(|_| format!("Malformed user id in key: {}", s))?;
        Ok(Self { guild_id, user_id })
    }
}

// =====================================================
// Domain Types
// =====================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub key: ProfileKey,
    pub description: Option<String>,
    pub handles: BTreeMap<Platform, String>,
    pub steam_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    /// Raw stored value of a field, including empty strings
    pub fn raw(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Description => self.description.as_deref(),
            ProfileField::SteamUrl => self.steam_url.as_deref(),
            ProfileField::Handle(p) => self.handles.get(&p).map(String::as_str),
        }
    }

    /// Value of a field when it is present and non-empty
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.raw(field).filter(|v| !v.is_empty())
    }

    pub fn has(&self, field: ProfileField) -> bool {
        self.get(field).is_some()
    }

    /// Present platform handles in display order
    pub fn present_handles(&self) -> impl Iterator<Item = (Platform, &str)> {
        Platform::all().filter_map(move |p| self.get(ProfileField::Handle(p)).map(|h| (p, h)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileStats {
    pub total_profiles: i64,
    pub guild_count: i64,
}
