//! Plain-text rendering of view models.

use std::fmt::Write;

use dojo_api::Dojo;
use dojo_common::{Notification, NotificationLevel};
use dojo_workspace::controller::SidebarView;
use dojo_workspace::{ContentPane, DojoStats, Session, WorkspaceView};

pub fn dojo_line(dojo: &Dojo) -> String {
    let marker = if dojo.official { " (official)" } else { "" };
    format!("{:<24} {}{marker}", dojo.id, dojo.name)
}

pub fn stats_line(stats: &DojoStats) -> String {
    format!(
        "{} challenges, {} solves, {} hackers, {} hacking now",
        stats.total_challenges, stats.total_solves, stats.unique_hackers, stats.hacking_now
    )
}

pub fn session_line(session: &Session) -> String {
    let starting = if session.is_starting { " (starting)" } else { "" };
    format!(
        "{} / {} / {}{starting}",
        session.dojo_name, session.module_name, session.challenge_name
    )
}

pub fn content_line(content: &ContentPane) -> String {
    match content {
        ContentPane::Empty => "No workspace on this page".into(),
        ContentPane::Description { challenge, text } => match text {
            Some(text) => format!("{challenge}\n\n{text}"),
            None => challenge.clone(),
        },
        ContentPane::Resource {
            name,
            resource_type,
        } => match resource_type {
            Some(kind) => format!("Resource: {name} ({kind})"),
            None => format!("Resource: {name}"),
        },
        ContentPane::NotStarted => "Workspace not started".into(),
        ContentPane::Starting => "Starting challenge...".into(),
        ContentPane::Loading {
            service,
            attempt,
            max_attempts,
        } => {
            if *attempt == 0 {
                format!("Loading {}...", service.label())
            } else {
                format!(
                    "Loading {}... (attempt {attempt}/{max_attempts})",
                    service.label()
                )
            }
        }
        ContentPane::Service { service, url } => format!("{}: {url}", service.label()),
        ContentPane::ServiceError { message, .. } => format!("Error: {message}"),
        ContentPane::StatusUnavailable { message } => {
            format!("Workspace status unavailable: {message}")
        }
    }
}

fn level_label(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Warning => "warn",
        NotificationLevel::Error => "error",
    }
}

pub fn notice_line(notice: &Notification) -> String {
    format!(
        "[{}] {}: {}",
        level_label(notice.level),
        notice.title,
        notice.body
    )
}

/// Modules and challenges, `*` for solved, `>` for viewed, `~` for running.
pub fn sidebar(sidebar: &SidebarView, expand_all: bool) -> String {
    let mut out = String::new();
    for module in &sidebar.modules {
        let solved = module.challenges.iter().filter(|c| c.solved).count();
        let _ = writeln!(
            out,
            "{} ({}/{})",
            module.name,
            solved,
            module.challenges.len()
        );
        if !(expand_all || module.expanded) {
            continue;
        }
        for item in &module.challenges {
            let mark = match (item.viewing, item.running, item.solved) {
                (true, _, _) => '>',
                (_, true, _) => '~',
                (_, _, true) => '*',
                _ => ' ',
            };
            let _ = writeln!(out, "  {mark} {:<20} {}", item.id, item.name);
        }
    }
    out
}

pub fn view(view: &WorkspaceView) -> String {
    let mut out = String::new();
    let header = &view.header;
    let mut crumbs: Vec<&str> = Vec::new();
    crumbs.extend(header.dojo_name.as_deref());
    crumbs.extend(header.module_name.as_deref());
    if crumbs.last() != Some(&header.title.as_str()) {
        crumbs.push(&header.title);
    }
    let solved = if header.solved { " [solved]" } else { "" };
    let _ = writeln!(out, "{}{solved}", crumbs.join(" / "));

    match &header.active {
        Some(session) => {
            let _ = writeln!(out, "Active: {}", session_line(session));
        }
        None => {
            let _ = writeln!(out, "Active: none");
        }
    }
    if let Some(banner) = &view.banner {
        let _ = writeln!(out, "! {}", banner.message());
    }
    let _ = writeln!(out, "{}", content_line(&view.content));
    for notice in &view.notices {
        let _ = writeln!(out, "{}", notice_line(notice));
    }
    out
}
