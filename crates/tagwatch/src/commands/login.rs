//! Login: exchange email/password for a session and list the devices
//! that can be tracked.

use dialoguer::Input;
use secrecy::SecretString;
use tracing::info;

use tagwatch_config::{PASSWORD_ENV, resolve_email};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;

use super::{Context, devices, prompt_err};

pub async fn handle(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if !args.force && ctx.engine.restore_session().await {
        info!(profile = %ctx.profile_name, "already logged in");
        if !global.quiet {
            eprintln!("Already logged in (use --force to log in again).");
        }
        let devices = devices::fetch(ctx).await?;
        devices::print_devices(&devices, global);
        return Ok(());
    }

    let email = match args.email.or_else(|| resolve_email(&ctx.profile)) {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(prompt_err)?,
    };
    if email.trim().is_empty() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "email cannot be empty".into(),
        });
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(pw) => SecretString::from(pw),
        Err(_) => SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?),
    };

    ctx.engine
        .login(email.trim(), password)
        .await
        .map_err(|e| ctx.auth_error(e))?;

    if !global.quiet {
        eprintln!("Logged in as {} (profile '{}').", email.trim(), ctx.profile_name);
    }

    let devices = devices::fetch(ctx).await?;
    devices::print_devices(&devices, global);
    Ok(())
}
