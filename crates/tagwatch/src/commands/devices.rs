//! Device listing: what the account exposes for pairing.

use tabled::Tabled;

use tagwatch_core::PairingCandidate;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&PairingCandidate> for DeviceRow {
    fn from(d: &PairingCandidate) -> Self {
        Self {
            kind: d.kind.to_string(),
            id: d.id.clone(),
            name: d.name.clone(),
        }
    }
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.ensure_session().await?;
    let devices = fetch(ctx).await?;
    print_devices(&devices, global);
    Ok(())
}

pub(super) async fn fetch(ctx: &Context) -> Result<Vec<PairingCandidate>, CliError> {
    ctx.with_reauth(|| ctx.engine.list_devices()).await
}

pub(super) fn print_devices(devices: &[PairingCandidate], global: &GlobalOpts) {
    let out = output::render_list(
        &global.output,
        devices,
        |d| DeviceRow::from(d),
        |d| d.id.clone(),
    );
    output::print_output(&out, global.quiet);
}
