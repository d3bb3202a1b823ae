//! Language-specific text processing
//!
//! Turns a fetched page into the plain token stream that is persisted as
//! the processed rendition and sent to the search index.

use crate::config::Language;
use scraper::Html;
use std::collections::HashSet;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// English stopwords
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "couldn't", "did", "didn't", "do", "does", "doesn't", "doing", "don't",
    "down", "during", "each", "few", "for", "from", "further", "had", "hadn't", "has", "hasn't",
    "have", "haven't", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his",
    "how", "i", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "shouldn't", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "wasn't", "we", "were", "weren't", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "won't", "would", "you",
    "you'd", "you'll", "you're", "you've", "your", "yours", "yourself", "yourselves",
];

/// Chinese function words; without a segmenter they also split CJK runs
const CHINESE_STOPWORDS: &[char] = &['的', '了', '在', '是', '我', '有', '和', '就', '不', '人'];

/// Text processing pipeline
pub trait TextProcessor: Send + Sync {
    /// Turns a raw page body into processed text for `language`
    fn process(&self, raw: &str, language: Language) -> String;
}

/// Visible-text extraction followed by a per-language token filter
///
/// English: lowercase, drop URLs, mentions and hashtags, split on anything
/// but letters, digits, `'` and `-`, then drop stopwords, single characters
/// and bare numbers. Chinese: keep runs of CJK ideographs, cut at stopword
/// characters. Both deduplicate tokens, keeping first occurrences in order.
#[derive(Debug, Clone)]
pub struct BasicTextProcessor {
    stopwords: HashSet<String>,
    chinese_stopwords: HashSet<char>,
}

impl Default for BasicTextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicTextProcessor {
    pub fn new() -> Self {
        Self::with_stopwords(ENGLISH_STOPWORDS.iter().map(|w| w.to_string()))
    }

    pub fn with_stopwords(stopwords: impl IntoIterator<Item = String>) -> Self {
        Self {
            stopwords: stopwords.into_iter().map(|w| w.to_lowercase()).collect(),
            chinese_stopwords: CHINESE_STOPWORDS.iter().copied().collect(),
        }
    }

    fn process_english(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split_whitespace()
            .filter(|word| !is_url_or_tag(word))
            .flat_map(|word| {
                split_digit_boundaries(word)
                    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '\'' || c == '-'))
                    .map(|t| t.trim_matches(&['\'', '-'][..]).to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|token| {
                token.chars().count() > 1
                    && !token.chars().all(|c| c.is_ascii_digit())
                    && !self.stopwords.contains(token)
            });

        dedupe(tokens).join(" ")
    }

    fn process_chinese(&self, text: &str) -> String {
        let mut runs = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if is_cjk(c) && !self.chinese_stopwords.contains(&c) {
                current.push(c);
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        dedupe(runs).join(" ")
    }
}

impl TextProcessor for BasicTextProcessor {
    fn process(&self, raw: &str, language: Language) -> String {
        let text = extract_text(raw);
        match language {
            Language::En => self.process_english(&text),
            Language::Cn => self.process_chinese(&text),
        }
    }
}

/// Extracts the visible text of an HTML document
///
/// Text inside scripts, styles and templates is skipped. Plain text input
/// passes through as a single text node.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

fn is_url_or_tag(word: &str) -> bool {
    word.starts_with("http://")
        || word.starts_with("https://")
        || word.starts_with("www.")
        || word.starts_with('@')
        || word.starts_with('#')
}

/// Inserts a space wherever letters and digits meet
fn split_digit_boundaries(word: &str) -> String {
    let mut out = String::with_capacity(word.len() + 4);
    let mut prev: Option<char> = None;
    for c in word.chars() {
        if let Some(p) = prev {
            let boundary = (p.is_ascii_digit() && c.is_ascii_alphabetic())
                || (p.is_ascii_alphabetic() && c.is_ascii_digit());
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

fn dedupe(tokens: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(raw: &str, language: Language) -> String {
        BasicTextProcessor::new().process(raw, language)
    }

    #[test]
    fn test_extract_text_skips_scripts() {
        let html = r#"<html><head><title>Title</title><style>p{}</style></head>
            <body><p>Hello <b>world</b></p><script>var x = 1;</script></body></html>"#;
        assert_eq!(extract_text(html), "Title Hello world");
    }

    #[test]
    fn test_english_pipeline() {
        let html = r#"<body><p>The Quick brown fox, the QUICK dog! Visit https://x.test/a or @bob #tag 2024 a</p></body>"#;
        assert_eq!(process(html, Language::En), "quick brown fox dog visit");
    }

    #[test]
    fn test_english_keeps_hyphen_and_apostrophe_words() {
        let html = "<p>state-of-the-art isn't o'reilly</p>";
        assert_eq!(process(html, Language::En), "state-of-the-art o'reilly");
    }

    #[test]
    fn test_english_splits_digits_from_letters() {
        assert_eq!(process("<p>html5 mp3player</p>", Language::En), "html mp player");
    }

    #[test]
    fn test_chinese_pipeline() {
        let html = "<p>你好，世界！Hello 你好 123 中文</p>";
        assert_eq!(process(html, Language::Cn), "你好 世界 中文");
    }

    #[test]
    fn test_chinese_stopwords_are_removed() {
        let html = "<p>我的书和你的笔，不是人</p>";
        assert_eq!(process(html, Language::Cn), "书 你 笔");
    }

    #[test]
    fn test_malformed_html() {
        let html = "<div><p>unclosed <b>tags here";
        assert_eq!(process(html, Language::En), "unclosed tags");
    }

    #[test]
    fn test_custom_stopwords() {
        let processor = BasicTextProcessor::with_stopwords(vec!["Fox".to_string()]);
        assert_eq!(processor.process("<p>the fox</p>", Language::En), "the");
    }
}
