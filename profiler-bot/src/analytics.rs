//! Fire-and-forget usage analytics.
//!
//! Commands describe what happened as an `AnalyticsEvent`; `Analytics::emit`
//! hands it to the configured sink on a background task. Delivery failures
//! are logged and never reach the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::AnalyticsConfig;

const SITE: &str = "https://profiler.hybridhavoc.com";
const COLLECT_URL: &str = "https://www.google-analytics.com/collect";

/// Virtual page the event is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub path: String,
    pub location: String,
    pub title: String,
}

impl Page {
    /// Site-level page; the location mirrors the path
    fn site(path: String, title: String) -> Self {
        let location = match path.as_str() {
            "/" => SITE.to_string(),
            p => format!("{}{}", SITE, p),
        };
        Self {
            path,
            location,
            title,
        }
    }

    /// Guild page: the path is `/{guild}{rest}`, the location lives under `/guilds/`
    fn guild(guild: &str, rest: &str, title: String) -> Self {
        Self {
            path: format!("/{}{}", guild, rest),
            location: format!("{}/guilds/{}{}", SITE, guild, rest),
            title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub page: Page,
    pub category: String,
    pub action: String,
    pub label: String,
}

impl AnalyticsEvent {
    fn new(page: Page, category: &str, action: &str, label: &str) -> Self {
        Self {
            page,
            category: category.to_string(),
            action: action.to_string(),
            label: label.to_string(),
        }
    }

    pub fn login() -> Self {
        Self::new(
            Page::site("/".to_string(), "Profiler".to_string()),
            "connection",
            "login",
            "success",
        )
    }

    pub fn help(guild: &str) -> Self {
        Self::new(
            Page::guild(guild, "/help", "Profiler - help".to_string()),
            "help",
            "viewed",
            guild,
        )
    }

    /// `action` is one of shared, previewed, viewed
    pub fn profile(guild: &str, author_tag: &str, action: &str) -> Self {
        Self::new(
            Page::guild(
                guild,
                &format!("/profile/{}", author_tag),
                format!("Profiler - {} on {}", author_tag, guild),
            ),
            "profile",
            action,
            guild,
        )
    }

    pub fn list(guild: &str, platform: &str) -> Self {
        Self::new(
            Page::site(
                format!("/platform/{}/list", platform),
                format!("Profiler - listing {}", platform),
            ),
            "list",
            "generated",
            guild,
        )
    }

    pub fn guild_added(guild: &str) -> Self {
        Self::new(
            Page::guild(guild, "", "Profiler - guild added".to_string()),
            "guild",
            "added",
            guild,
        )
    }

    pub fn guild_deleted(guild: &str) -> Self {
        Self::new(
            Page::guild(guild, "", "Profiler - guild deleted".to_string()),
            "guild",
            "deleted",
            guild,
        )
    }
}

/// Destination for analytics events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: AnalyticsEvent) -> Result<(), String>;
}

/// Sink used when tracking is not configured
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn send(&self, _event: AnalyticsEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Universal Analytics Measurement Protocol: one pageview hit and one event hit per event
pub struct MeasurementProtocolSink {
    config: AnalyticsConfig,
    client: reqwest::Client,
}

impl MeasurementProtocolSink {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn hit<'a>(&'a self, hit_type: &'static str, event: &'a AnalyticsEvent) -> Hit<'a> {
        let is_event = hit_type == "event";
        Hit {
            v: "1",
            tid: &self.config.tracking_id,
            cid: &self.config.client_id,
            t: hit_type,
            dp: &event.page.path,
            dl: &event.page.location,
            dt: &event.page.title,
            ec: is_event.then_some(event.category.as_str()),
            ea: is_event.then_some(event.action.as_str()),
            el: is_event.then_some(event.label.as_str()),
        }
    }
}

/// Form body of a single collect request
#[derive(Debug, Serialize)]
struct Hit<'a> {
    v: &'static str,
    tid: &'a str,
    cid: &'a str,
    t: &'static str,
    dp: &'a str,
    dl: &'a str,
    dt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ec: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ea: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    el: Option<&'a str>,
}

#[async_trait]
impl EventSink for MeasurementProtocolSink {
    async fn send(&self, event: AnalyticsEvent) -> Result<(), String> {
        for hit_type in ["pageview", "event"] {
            let resp = self
                .client
                .post(COLLECT_URL)
                .form(&self.hit(hit_type, &event))
                .send()
                .await
                .map_err(|e| format!("Analytics request failed: {}", e))?;
            if !resp.status().is_success() {
                return Err(format!("Analytics {} hit rejected: {}", hit_type, resp.status()));
            }
        }
        Ok(())
    }
}

/// Shared handle the bot emits events through
#[derive(Clone)]
pub struct Analytics {
    sink: Arc<dyn EventSink>,
}

impl Analytics {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn from_config(config: Option<&AnalyticsConfig>) -> Self {
        match config {
            Some(c) => {
                log::info!("Analytics: Tracking enabled for {}", c.tracking_id);
                Self::new(Arc::new(MeasurementProtocolSink::new(c.clone())))
            }
            None => {
                log::info!("Analytics: No tracking id configured, events are dropped");
                Self::new(Arc::new(NoopSink))
            }
        }
    }

    /// Deliver an event in the background. The handle is only useful to tests.
    pub fn emit(&self, event: AnalyticsEvent) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let summary = format!("{}/{}", event.category, event.action);
            if let Err(e) = sink.send(event).await {
                log::warn!("Analytics: Failed to deliver {}: {}", summary, e);
            } else {
                log::debug!("Analytics: Delivered {}", summary);
            }
        })
    }
}
