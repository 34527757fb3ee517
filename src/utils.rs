// utils.rs - Small text and time helpers shared by clients and agents
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VIDEO_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})").unwrap(),
    ];
    static ref ISO_DURATION: Regex =
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap();
}

/// Format seconds as MM:SS, or HH:MM:SS past the hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Extract the 11-character video id from watch, short and embed URLs
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a YouTube content duration such as `PT1H2M3S` into seconds
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let caps = ISO_DURATION.captures(value)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };
    part(1)?
        .checked_mul(3600)?
        .checked_add(part(2)?.checked_mul(60)?)?
        .checked_add(part(3)?)
}

/// Truncate to at most `max_chars` characters including the suffix
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}
