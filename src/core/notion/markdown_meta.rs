// Front-matter-ish metadata pulled out of Markdown notes before they are
// uploaded as Notion rows.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownMeta {
    pub tags: Vec<String>,
    pub topics: Vec<String>,
    pub quote: Option<String>,
}

/// Returns the text after `label:` when the line starts with `label:` or
/// `**label:**`, case-insensitively.
fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let lower = line.to_lowercase();
    let plain = format!("{label}:");
    let bold = format!("**{label}:**");

    if lower.starts_with(&bold) {
        line.get(bold.len()..)
    } else if lower.starts_with(&plain) {
        line.get(plain.len()..)
    } else {
        None
    }
}

pub fn parse_markdown_meta(content: &str) -> MarkdownMeta {
    let mut meta = MarkdownMeta::default();

    for line in content.lines() {
        if let Some(rest) = labelled_value(line, "tags") {
            meta.tags = rest
                .split(|c: char| c == ',' || c == ' ')
                .map(|t| t.trim().trim_matches('#').trim_matches('*'))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(rest) = labelled_value(line, "topics") {
            meta.topics = rest
                .split(',')
                .map(|t| t.trim().trim_matches('*').trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    if let Some((_, after)) = content.split_once("### Quote") {
        meta.quote = after
            .trim()
            .lines()
            .next()
            .map(|line| line.trim().trim_matches('"').to_string())
            .filter(|q| !q.is_empty());
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_topics_and_quote() {
        let content = "# Note\n\
            **Tags:** #rust, #notion automation\n\
            Topics: Video Ads, Growth\n\
            \n\
            ### Quote\n\
            \"Ship it.\"\n\
            more text";

        let meta = parse_markdown_meta(content);
        assert_eq!(meta.tags, vec!["rust", "notion", "automation"]);
        assert_eq!(meta.topics, vec!["Video Ads", "Growth"]);
        assert_eq!(meta.quote.as_deref(), Some("Ship it."));
    }

    #[test]
    fn missing_metadata_is_empty() {
        let meta = parse_markdown_meta("just a paragraph\n### Quote\n   \n");
        assert_eq!(meta, MarkdownMeta::default());
    }

    #[test]
    fn lowercase_labels_are_recognised() {
        let meta = parse_markdown_meta("tags: one two");
        assert_eq!(meta.tags, vec!["one", "two"]);
    }
}
