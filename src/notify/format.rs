//! Message rendering

/// Renders the announcement for one article
///
/// ```
/// use feedrelay::notify::render_message;
///
/// let text = render_message("Blog", "Hello", "https://x.com/a", &[]);
/// assert_eq!(text, "Blog: [Hello](https://x.com/a)");
/// ```
pub fn render_message(source: &str, title: &str, url: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        format!("{}: [{}]({})", source, title, url)
    } else {
        format!("{}: [{}]({})\n{}\n", source, title, url, format_tags(tags))
    }
}

/// `#`-prefixed, comma separated tags
pub fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| {
            if tag.starts_with('#') {
                tag.clone()
            } else {
                format!("#{}", tag)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
