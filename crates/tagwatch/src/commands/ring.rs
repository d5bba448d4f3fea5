//! Ring a phone through the account's alert endpoint.

use crate::cli::{GlobalOpts, RingArgs};
use crate::error::CliError;

use super::Context;

pub async fn handle(ctx: &Context, args: RingArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.ensure_session().await?;
    ctx.with_reauth(|| ctx.engine.ring(&args.device_id)).await?;
    if !global.quiet {
        eprintln!("Ringing phone {}", args.device_id);
    }
    Ok(())
}
