/// Rewrites a protocol-relative URL (`//host/path`) to HTTPS; anything else passes through
pub fn normalize_link(link: &str) -> String {
    if link.starts_with("//") {
        format!("https:{}", link)
    } else {
        link.to_string()
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert a search query to a sanitized filename stem
pub fn sanitize_filename(query: &str) -> String {
    let mut name = collapse_whitespace(query).replace(' ', "_");
    name = name.replace(['/', '\\', ':', '?', '&', '=', '#', '%', '*', '"', '<', '>', '|'], "_");

    if name.is_empty() {
        return "listing".to_string();
    }

    // Limit filename length
    if name.chars().count() > 100 {
        name.chars().take(100).collect()
    } else {
        name
    }
}
