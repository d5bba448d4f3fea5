//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::{ExposeSecret, SecretString};

use tagwatch_config::keyring_set;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::prompt_err;

const REDACTED: &str = "********";

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),
        ConfigCommand::Show => {
            let cfg = redacted(config::load_config_or_default(global));
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile_name().to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ConfigCommand::SetPassword => set_password(global),
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path(global);
    eprintln!("tagwatch configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let email: String = Input::new()
        .with_prompt("Chipolo account email")
        .interact_text()
        .map_err(prompt_err)?;
    if email.trim().is_empty() {
        return Err(CliError::Validation {
            field: "email".into(),
            reason: "email cannot be empty".into(),
        });
    }

    let password = rpassword::prompt_password("Password (leave empty to ask at login): ")
        .map_err(prompt_err)?;
    let password = if password.is_empty() {
        None
    } else {
        store_password(&profile_name, SecretString::from(password), global.no_keyring)?
    };

    let minutes: u64 = Input::new()
        .with_prompt("Poll interval in minutes (short intervals get throttled)")
        .default(15)
        .interact_text()
        .map_err(prompt_err)?;

    let profile = Profile {
        email: Some(email.trim().to_owned()),
        password,
        poll_interval_secs: Some(minutes * 60),
        ..Profile::default()
    };

    let mut cfg = config::load_config_from(&config_path).unwrap_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config_to(&cfg, &config_path)?;

    eprintln!("\nConfiguration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Next: tagwatch login");
    Ok(())
}

/// Put the password in the keyring if the user agrees, returning the
/// plaintext to write to the profile otherwise.
fn store_password(
    profile_name: &str,
    password: SecretString,
    no_keyring: bool,
) -> Result<Option<String>, CliError> {
    if no_keyring {
        return Ok(Some(password.expose_secret().to_owned()));
    }
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        keyring_set(profile_name, "password", &password)?;
        eprintln!("   Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password.expose_secret().to_owned()))
    }
}

// ── Set password ────────────────────────────────────────────────────

fn set_password(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path(global);
    let mut cfg = config::load_config_or_default(global);
    let profile_name = config::active_profile_name(global, &cfg);

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    let password = SecretString::from(password);

    if global.no_keyring {
        let profile = cfg.profiles.entry(profile_name.clone()).or_default();
        profile.password = Some(password.expose_secret().to_owned());
        config::save_config_to(&cfg, &config_path)?;
        eprintln!("Password saved to {} (plaintext)", config_path.display());
    } else {
        keyring_set(&profile_name, "password", &password)?;
        // Drop the plaintext copy now that the keyring holds it.
        if let Some(profile) = cfg.profiles.get_mut(&profile_name) {
            if profile.password.take().is_some() {
                config::save_config_to(&cfg, &config_path)?;
            }
        }
        eprintln!("Password for profile '{profile_name}' stored in system keyring");
    }
    Ok(())
}

fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_never_prints_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                email: Some("me@example.com".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let shown = redacted(cfg);
        let profile = &shown.profiles["home"];
        assert_eq!(profile.password.as_deref(), Some(REDACTED));
        assert_eq!(profile.email.as_deref(), Some("me@example.com"));
    }
}
