//! Watch mode: register devices, start the engine, and report changes
//! until Ctrl-C.

use tokio::signal;
use tracing::{info, warn};

use tagwatch_core::{DeviceKind, TickOutcome};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

use super::{Context, devices};

pub async fn handle(ctx: &Context, args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.ensure_session().await?;
    register_devices(ctx).await?;

    if args.once {
        let outcome = ctx.engine.tick().await;
        return once_result(ctx, &outcome, global);
    }

    ctx.engine.on_init().await;
    if !global.quiet {
        eprintln!(
            "Watching {} device(s) every {}. Press Ctrl-C to stop.",
            ctx.engine.devices().len(),
            humantime::format_duration(ctx.engine.config().poll_interval)
        );
    }

    let mut poll_state = ctx.engine.subscribe_poll_state();
    loop {
        tokio::select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
                break;
            }
            changed = poll_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *poll_state.borrow_and_update();
                match state.remaining() {
                    Some(left) if state.blocked => warn!(
                        resume_in = %humantime::format_duration(round_secs(left)),
                        "polling paused by the remote service"
                    ),
                    _ => info!("polling resumed"),
                }
            }
        }
    }

    info!("shutting down");
    ctx.engine.shutdown().await;
    Ok(())
}

/// Track the profile's configured devices, or everything on the account
/// when none are configured.
async fn register_devices(ctx: &Context) -> Result<(), CliError> {
    let configured = ctx
        .profile
        .tags
        .iter()
        .map(|id| (DeviceKind::Tag, id.clone()))
        .chain(
            ctx.profile
                .phones
                .iter()
                .map(|id| (DeviceKind::Phone, id.clone())),
        )
        .collect::<Vec<_>>();

    let devices = if configured.is_empty() {
        devices::fetch(ctx)
            .await?
            .into_iter()
            .map(|d| (d.kind, d.id))
            .collect()
    } else {
        configured
    };

    for (kind, id) in &devices {
        ctx.engine.register_device(*kind, id);
    }
    info!(count = ctx.engine.devices().len(), "devices registered");
    Ok(())
}

fn once_result(ctx: &Context, outcome: &TickOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    match outcome {
        TickOutcome::Reconciled(report) => {
            if !global.quiet {
                eprintln!(
                    "Poll complete: {} write(s), {} flow(s), {} skipped, {} failed.",
                    report.writes, report.flows, report.skipped, report.failed
                );
            }
            Ok(())
        }
        TickOutcome::NoSession => Err(CliError::NotLoggedIn),
        TickOutcome::AuthFailed => Err(CliError::AuthFailed {
            profile: ctx.profile_name.clone(),
        }),
        TickOutcome::Blocked | TickOutcome::RateLimited { .. } => Err(CliError::RateLimited {
            detail: "polling paused for 24 hours".into(),
        }),
        TickOutcome::Failed => Err(CliError::ApiError {
            code: "poll".into(),
            message: ctx.engine.last_error().unwrap_or_default(),
        }),
    }
}

fn round_secs(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(d.as_secs())
}
