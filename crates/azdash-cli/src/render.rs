//! Plain-text rendering of dashboard data.

use std::fmt::Write;

use azdash_client::{AuditEvent, Dashboard, Health, User};
use chrono::{DateTime, Local};

/// Left-aligned columns sized to the widest cell.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.to_vec());
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.\n".to_string();
    }
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.username.clone(),
                u.email.clone(),
                u.role.clone(),
            ]
        })
        .collect();
    table(&["ID", "USERNAME", "EMAIL", "ROLE"], &rows)
}

pub fn audit(events: &[AuditEvent]) -> String {
    if events.is_empty() {
        return "No audit events.\n".to_string();
    }
    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|e| {
            vec![
                timestamp(&e.timestamp),
                e.method.clone(),
                e.path.clone(),
                e.user.clone(),
                e.status.to_string(),
            ]
        })
        .collect();
    table(&["TIME", "METHOD", "PATH", "USER", "STATUS"], &rows)
}

pub fn health(health: &Health) -> String {
    format!("Backend health: {}\n", health.status)
}

/// Local time when the backend sent RFC 3339, otherwise as sent.
pub fn timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn dashboard(dash: &Dashboard) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Health ==");
    match &dash.health {
        Some(h) => out.push_str(&health(h)),
        None => out.push_str("Backend health: unavailable\n"),
    }

    let _ = writeln!(out, "\n== Users ==");
    match &dash.users {
        Some(u) => out.push_str(&users(u)),
        None => out.push_str("(unavailable)\n"),
    }

    let _ = writeln!(out, "\n== Audit ==");
    match &dash.audit {
        Some(a) => out.push_str(&audit(a)),
        None => out.push_str("(unavailable)\n"),
    }

    if !dash.failures.is_empty() {
        let _ = writeln!(out);
        for failure in &dash.failures {
            let _ = writeln!(out, "! {}: {}", failure.section, failure.message);
        }
        if dash.failures.iter().any(|f| f.sign_in_required) {
            let _ = writeln!(out, "Run `azdash sign-in` and try again.");
        }
    }
    out
}
