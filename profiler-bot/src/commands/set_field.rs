//! Field setters: description, platform handles and steamurl

use profiler_types::ProfileField;

use super::{CommandContext, CommandError, Invocation, Outcome};

pub async fn execute(
    field: ProfileField,
    value: &str,
    inv: &Invocation,
    ctx: &CommandContext,
) -> Result<Outcome, CommandError> {
    log::debug!("Commands: Storing {} = '{}' for {}", field, value, inv.key());
    ctx.store
        .set_field(&inv.key(), field, value)
        .await
        .map_err(CommandError::Store)?;
    Ok(Outcome::ack())
}
