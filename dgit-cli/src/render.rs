//! Human-readable rendering for `log` and `cat-file`

use chrono::{DateTime, FixedOffset};
use dgit_core::{Commit, ObjectId, Signature, TreeEntry};
use std::fmt::Write;

/// One `log` record: header lines, a blank line, the indented message
pub fn log_entry(id: &ObjectId, commit: &Commit) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "commit {}", id);
    if let Some(author) = &commit.author {
        let _ = writeln!(out, "Author: {} <{}>", author.name, author.email);
        let _ = writeln!(out, "Date:   {}", format_date(author));
    }
    out.push('\n');
    for line in commit.message.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    out
}

/// `ls-tree` listing, one entry per line
pub fn tree_listing(entries: &[TreeEntry]) -> String {
    entries.iter().map(|e| format!("{}\n", e)).collect()
}

/// Signature time in its own offset, or the raw epoch if it cannot be rendered
pub fn format_date(sig: &Signature) -> String {
    let rendered = parse_offset(&sig.offset).and_then(|offset| {
        DateTime::from_timestamp(sig.timestamp, 0).map(|utc| {
            utc.with_timezone(&offset)
                .format("%a %b %-d %H:%M:%S %Y %z")
                .to_string()
        })
    });
    rendered.unwrap_or_else(|| format!("{} {}", sig.timestamp, sig.offset))
}

fn parse_offset(label: &str) -> Option<FixedOffset> {
    let sign = match label.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = label.get(1..)?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
