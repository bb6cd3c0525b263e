/*!
format.rs

Terminal styling for human output paths.

- StyleOptions::detect(): NO_COLOR / COLUMNS aware
- color(role, text, &style)
- marker(kind, &style): the classic [+] / [-] / [i] / [!] probe markers
- status_role(bucket): map a response bucket onto a color role
- box_header(title, subtitle_opt, &style): single-line boxed banner
- table(headers, rows, &style)
- truncate_ellipsis(s, max_chars)

JSON output paths do not use these helpers; machine output stays clean.
*/

use std::borrow::Cow;

use crate::http::StatusBucket;

/* ---- Style Options ---- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none();
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        StyleOptions {
            use_color,
            term_width,
        }
    }
}

/* ---- Color / Markers ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Success,
    Warning,
    Error,
    Dim,
    Bold,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",    // cyan-ish
        Role::Secondary => "38;5;250", // gray
        Role::Success => "38;5;82",    // green
        Role::Warning => "38;5;214",   // orange
        Role::Error => "38;5;196",     // red
        Role::Dim => "2",
        Role::Bold => "1",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/// Line markers in the house style of probing tools.
#[derive(Debug, Clone, Copy)]
pub enum Marker {
    /// `[+]`: a result line.
    Plus,
    /// `[-]`: a rejection or failure line.
    Minus,
    /// `[i]`: informational.
    Info,
    /// `[!]`: fatal diagnostic.
    Fatal,
}

pub fn marker(kind: Marker, style: &StyleOptions) -> String {
    let (text, role) = match kind {
        Marker::Plus => ("[+]", Role::Success),
        Marker::Minus => ("[-]", Role::Error),
        Marker::Info => ("[i]", Role::Warning),
        Marker::Fatal => ("[!]", Role::Error),
    };
    color(role, text, style)
}

/// Color role for a response status bucket.
pub fn status_role(bucket: StatusBucket) -> Role {
    match bucket {
        StatusBucket::Accepted => Role::Success,
        StatusBucket::Rejected => Role::Error,
        StatusBucket::Redirected => Role::Warning,
        StatusBucket::Other => Role::Secondary,
    }
}

/* ---- Box Header ---- */

/// Single-line boxed banner. Content wider than the terminal is truncated
/// with an ellipsis rather than wrapped.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title_styled = color(Role::Primary, title.as_ref(), style);
    let inner = match subtitle {
        Some(sub) => format!(
            "{title_styled}  {}",
            color(Role::Secondary, sub.as_ref(), style)
        ),
        None => title_styled,
    };

    let max_inner = style.term_width.saturating_sub(4).max(16);
    let inner = if display_width(&inner) > max_inner {
        // Truncation operates on stripped text; styling does not survive it.
        let plain = strip_ansi(&inner).into_owned();
        truncate_ellipsis(&plain, max_inner)
    } else {
        inner
    };

    let width = display_width(&inner) + 2;
    let mut lines = Vec::with_capacity(3);
    lines.push(format!("┌{}┐", "─".repeat(width)));
    lines.push(format!("│ {inner} │"));
    lines.push(format!("└{}┘", "─".repeat(width)));
    lines.join("\n")
}

/* ---- Table Rendering ---- */

/// Plain two-space-separated table with a header separator. Columns wider
/// than their share of the terminal are shrunk and cells truncated.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Greedy shrink from the widest column until the table fits.
    let sep_total = (cols - 1) * 2;
    let mut overflow =
        (widths.iter().sum::<usize>() + sep_total).saturating_sub(style.term_width);
    while overflow > 0 {
        let Some((idx, &w)) = widths
            .iter()
            .enumerate()
            .max_by_key(|(_, w)| **w)
            .filter(|(_, w)| **w > 4)
        else {
            break;
        };
        let shrink = overflow.min(w - 4);
        widths[idx] -= shrink;
        overflow -= shrink;
    }

    let mut out = String::new();
    for (i, h) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(&color(Role::Bold, pad_or_truncate(h, widths[i]), style));
    }
    out.push('\n');
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&color(Role::Dim, sep.join("  "), style));
    for row in rows {
        out.push('\n');
        for c in 0..cols {
            if c > 0 {
                out.push_str("  ");
            }
            let raw = row.get(c).map(String::as_str).unwrap_or("");
            out.push_str(&pad_or_truncate(raw, widths[c]));
        }
    }
    out
}

fn pad_or_truncate(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    let truncated = truncate_ellipsis(&strip_ansi(s), width);
    let pad = width.saturating_sub(display_width(&truncated));
    format!("{truncated}{}", " ".repeat(pad))
}

/* ---- Text / ANSI Helpers ---- */

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 1 {
        return "…".into();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    // Scans for CSI sequences (ESC '[' ... final byte); no regex needed.
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if t.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* ---- Tests ---- */
