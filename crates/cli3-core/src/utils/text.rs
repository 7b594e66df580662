use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Header markup uses `<br>` for line breaks.
///
/// # Examples
/// ```
/// use cli3_core::utils::text::header_lines;
/// assert_eq!(header_lines("Total<br>qty"), "Total\nqty");
/// ```
pub fn header_lines(title: &str) -> String {
    title.replace("<br>", "\n")
}

/// Truncate text to a display width, appending `...` when shortened
///
/// # Examples
/// ```
/// use cli3_core::utils::text::truncate_text;
/// assert_eq!(truncate_text("Hello World!", 8), "Hello...");
/// ```
pub fn truncate_text(text: &str, max_width: usize) -> String {
    const ELLIPSIS: &str = "...";
    if text.width() <= max_width {
        return text.to_string();
    }
    let Some(budget) = max_width.checked_sub(ELLIPSIS.len()) else {
        return ELLIPSIS[..max_width].to_string();
    };

    let mut used = 0;
    let kept: String = text
        .chars()
        .take_while(|ch| {
            used += ch.width().unwrap_or(0);
            used <= budget
        })
        .collect();
    kept + ELLIPSIS
}

/// Human readable byte count for the request log.
pub fn format_bytes(bytes: usize) -> String {
    match bytes {
        0..=1023 => format!("{} bytes", bytes),
        1024..=1_048_575 => format!("{:.1} KB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MB", bytes as f64 / 1_048_576.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lines() {
        assert_eq!(header_lines("Plain"), "Plain");
        assert_eq!(header_lines("a<br>b<br>c"), "a\nb\nc");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Hello", 10), "Hello");
        assert_eq!(truncate_text("Hello World!", 8), "Hello...");
        assert_eq!(truncate_text("", 5), "");
        assert_eq!(truncate_text("Hello", 2), "..");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each CJK char is two columns wide
        assert_eq!(truncate_text("日本語テキスト", 7), "日本...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.0 MB");
    }
}
