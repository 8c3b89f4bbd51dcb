//! Roll result formatting for display.
//!
//! Renders a [`RollResult`] as a single Discord message:
//!
//! ```text
//! *<@AUTHOR>* rolled `DESCRIPTION`: *REASON*
//! *HEADLINE*
//! _BREAKDOWN_
//! ```

use crate::common::UserId;
use crate::dice::RollResult;

/// Discord's message length limit, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Room kept free for the truncation marker.
const TRUNCATION_RESERVE: usize = 40;

/// Format a roll for `author`.
///
/// Engine lines are split on embedded newlines first. The first resulting
/// line is the headline and is wrapped in `*..*`, the rest in `_.._`, by
/// position, blank ones included. Lines are trimmed before markup is applied.
/// Any non-empty reason is rendered verbatim. Output longer than
/// [`MAX_MESSAGE_LEN`] loses trailing lines in favour of a
/// `_… N more lines_` marker.
pub fn format_roll(author: UserId, result: &RollResult) -> String {
    let reason = match result.reason.as_deref() {
        Some(reason) if !reason.is_empty() => format!(" *{}*", reason),
        _ => String::new(),
    };
    let header = format!("*<@{}>* rolled `{}`:{}", author, result.description, reason);

    let lines: Vec<String> = result
        .lines
        .iter()
        .flat_map(|line| line.split('\n'))
        .map(str::trim)
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("*{}*", line)
            } else {
                format!("_{}_", line)
            }
        })
        .collect();

    let text = format!("{}\n{}", header, lines.join("\n"));
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text;
    }

    clamp(header, &lines)
}

fn clamp(header: String, lines: &[String]) -> String {
    let budget = MAX_MESSAGE_LEN - TRUNCATION_RESERVE;

    let mut out = truncate_chars(header, budget);
    let mut used = out.chars().count();
    let mut shown = 0;
    for line in lines {
        let len = line.chars().count() + 1;
        if used + len > budget {
            break;
        }
        out.push('\n');
        out.push_str(line);
        used += len;
        shown += 1;
    }

    let hidden = lines.len() - shown;
    if hidden > 0 {
        out.push_str(&format!("\n_… {} more lines_", hidden));
    }
    out
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max.saturating_sub(1)) {
        Some((idx, _)) if text.chars().count() > max => format!("{}…", &text[..idx]),
        _ => text,
    }
}
