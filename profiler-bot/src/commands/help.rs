//! Help command - sends the command reference privately

use super::{Invocation, Outcome};
use crate::analytics::AnalyticsEvent;
use crate::render::{self, RenderTarget};

pub fn execute(inv: &Invocation, prefix: &str) -> Outcome {
    Outcome::send(
        RenderTarget::Author,
        render::render_help(prefix),
        AnalyticsEvent::help(&inv.guild_name),
    )
}
