//! Session and polling status for the active profile. Never touches the
//! network.

use std::fmt::Write as _;

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct StatusView {
    profile: String,
    api_url: String,
    poll_interval: String,
    logged_in: bool,
    account_id: Option<String>,
    has_token: bool,
    email: Option<String>,
    tracked_tags: Vec<String>,
    tracked_phones: Vec<String>,
    state_file: String,
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.engine.restore_session().await;
    let session = ctx.engine.session();
    let config = ctx.engine.config();

    let view = StatusView {
        profile: ctx.profile_name.clone(),
        api_url: config.base_url()?.to_string(),
        poll_interval: humantime::format_duration(config.poll_interval).to_string(),
        logged_in: session.logged_in,
        account_id: session.account_id.clone(),
        has_token: session.token.is_some(),
        email: ctx.profile.email.clone(),
        tracked_tags: ctx.profile.tags.clone(),
        tracked_phones: ctx.profile.phones.clone(),
        state_file: ctx.store.state_path().display().to_string(),
    };

    let out = output::render_single(&global.output, &view, render_detail, |v| {
        if v.logged_in { "logged_in" } else { "logged_out" }.to_owned()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_detail(v: &StatusView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profile:        {}", v.profile);
    let _ = writeln!(out, "API:            {}", v.api_url);
    let _ = writeln!(out, "Poll interval:  {}", v.poll_interval);
    let _ = writeln!(
        out,
        "Session:        {}",
        if v.logged_in { "logged in" } else { "logged out" }
    );
    let _ = writeln!(
        out,
        "Account:        {}",
        v.account_id.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "Email:          {}", v.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Tags:           {}", list_or_all(&v.tracked_tags));
    let _ = writeln!(out, "Phones:         {}", list_or_all(&v.tracked_phones));
    let _ = write!(out, "State file:     {}", v.state_file);
    out
}

fn list_or_all(ids: &[String]) -> String {
    if ids.is_empty() {
        "all on account".into()
    } else {
        ids.join(", ")
    }
}
