//! Full-screen player view
//!
//! Draws the whole frame from `State` each tick. Rendering only reads the
//! controller; it never changes playback.

use crate::speech::{text, MAX_TEXT_LENGTH};
use crate::state::State;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Rows used by the spectrum when there is room for it
const SPECTRUM_HEIGHT: usize = 4;

/// Partial block characters, empty to full
const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const HELP: &str =
    "space play/pause  ←/→ skip  s stop  0 start  j jump  g generate  v voice  o open  p paste  +/- vol  q quit";

/// Format seconds as `mm:ss`
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Cut `s` to at most `width` terminal columns
pub fn fit(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

/// Word-wrap text to `width` columns
///
/// Words wider than a line are broken at the column limit.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut used = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            let sep = usize::from(used > 0);

            if used + sep + word_width <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                used += sep + word_width;
                continue;
            }

            if used > 0 {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            for ch in word.chars() {
                let w = ch.width().unwrap_or(0);
                if used + w > width {
                    lines.push(std::mem::take(&mut line));
                    used = 0;
                }
                line.push(ch);
                used += w;
            }
        }
        lines.push(line);
    }

    lines
}

/// Horizontal progress bar
pub fn progress_bar(current: f64, duration: f64, width: usize) -> String {
    let frac = if duration > 0.0 {
        (current / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (frac * width as f64).round() as usize;
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

/// Vertical bars for analyser byte levels, top row first
///
/// `bars` columns are drawn, each the loudest of its share of the bins,
/// separated by a space.
pub fn spectrum_rows(levels: &[u8], bars: usize, height: usize) -> Vec<String> {
    if levels.is_empty() || bars == 0 || height == 0 {
        return vec![String::new(); height];
    }

    let eighths: Vec<usize> = (0..bars)
        .map(|i| {
            let start = i * levels.len() / bars;
            let end = ((i + 1) * levels.len() / bars).max(start + 1).min(levels.len());
            let peak = levels[start..end].iter().copied().max().unwrap_or(0);
            (peak as usize * height * 8 + 127) / 255
        })
        .collect();

    (0..height)
        .map(|row| {
            let floor = (height - 1 - row) * 8;
            let mut line = String::with_capacity(bars * 2);
            for (i, &level) in eighths.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                line.push(BLOCKS[level.saturating_sub(floor).min(8)]);
            }
            line
        })
        .collect()
}

/// Render a complete frame
///
/// Every line ends with clear-to-end-of-line so the previous frame never
/// needs a full clear.
pub fn render(state: &State, cols: u16, rows: u16) -> String {
    let width = cols.max(20) as usize;
    let rows = rows.max(8) as usize;
    let mut lines: Vec<String> = Vec::with_capacity(rows);

    // Header
    let voice = state.voice();
    lines.push(format!(
        "\x1b[1m{}\x1b[0m",
        fit(
            &format!(
                "{}  ·  Voice: {} ({})  ·  Vol {}%",
                crate::APP_NAME,
                voice,
                voice.description(),
                state.volume()
            ),
            width
        )
    ));
    lines.push("─".repeat(width));

    let spectrum_height = if state.config.visualizer() && rows >= 16 {
        SPECTRUM_HEIGHT
    } else {
        0
    };
    // A modal prompt may span several lines in place of the help line
    let prompt: Option<Vec<String>> = state
        .handlers
        .prompt()
        .map(|p| p.lines().map(str::to_string).collect());
    let prompt_height = prompt.as_ref().map_or(1, |p| p.len().max(1));

    let fixed = 7 + prompt_height + spectrum_height;
    let preview_height = rows.saturating_sub(fixed).max(1);

    // Text preview
    let body = state.text();
    if body.trim().is_empty() {
        lines.push(format!(
            "\x1b[2m{}\x1b[0m",
            fit("Paste text (p) or open a document (o) to begin.", width)
        ));
        lines.extend(std::iter::repeat(String::new()).take(preview_height - 1));
    } else {
        let mut wrapped = wrap(body, width);
        let overflow = wrapped.len() > preview_height;
        wrapped.truncate(preview_height);
        if overflow {
            if let Some(last) = wrapped.last_mut() {
                *last = format!("{}…", fit(last, width - 1));
            }
        }
        let shown = wrapped.len();
        lines.extend(wrapped);
        lines.extend(std::iter::repeat(String::new()).take(preview_height - shown));
    }

    let counter = format!("{}/{}", text::char_count(body), MAX_TEXT_LENGTH);
    lines.push(format!("{:>width$}", counter, width = width));
    lines.push("─".repeat(width));

    // Spectrum
    if spectrum_height > 0 {
        let analyser = state.controller.analyser();
        let mut levels = vec![0u8; analyser.frequency_bin_count()];
        if state.controller.is_playing() {
            analyser.byte_frequency_data(&mut levels);
        }
        lines.extend(spectrum_rows(&levels, (width + 1) / 2, spectrum_height));
    }

    // Progress
    let current = state.controller.current_time();
    let duration = state.controller.duration();
    lines.push(progress_bar(current, duration, width));

    let icon = match state.status_label() {
        "Playing" => "▶",
        "Paused" => "⏸",
        "Generating" => "…",
        _ => "■",
    };
    let times = format!("{} / {}", format_time(current), format_time(duration));
    let label = format!("{} {}", icon, state.status_label());
    let gap = width.saturating_sub(label.width() + times.width()).max(1);
    lines.push(fit(&format!("{}{}{}", label, " ".repeat(gap), times), width));

    // Notice
    lines.push(match state.notice() {
        Some(notice) if notice.is_error() => {
            format!("\x1b[31m{}\x1b[0m", fit(notice.text(), width))
        }
        Some(notice) => fit(notice.text(), width),
        None => String::new(),
    });

    // Help or modal prompt
    match prompt {
        Some(prompt) => lines.extend(
            prompt
                .iter()
                .map(|line| format!("\x1b[7m{}\x1b[0m", fit(line, width))),
        ),
        None => lines.push(format!("\x1b[2m{}\x1b[0m", fit(HELP, width))),
    }

    let mut frame = String::from("\x1b[H");
    for (i, line) in lines.iter().take(rows).enumerate() {
        if i > 0 {
            frame.push_str("\r\n");
        }
        frame.push_str(line);
        frame.push_str("\x1b[K");
    }
    frame.push_str("\x1b[J");
    frame
}
