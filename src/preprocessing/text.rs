use crate::error::{Result, SentimentError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

type Pattern = Lazy<std::result::Result<Regex, regex::Error>>;

// CSS media queries with at most one level of nested braces
static MEDIA_QUERY_RE: Pattern =
    Lazy::new(|| Regex::new(r"@media[^{]+\{(?:[^{}]+|\{[^{}]*\})*\}"));
static CID_IMAGE_RE: Pattern = Lazy::new(|| Regex::new(r"\[cid:image[^\]]+\]"));
static NEWLINE_RE: Pattern = Lazy::new(|| Regex::new(r"[\n\r]+"));
static HTML_TAG_RE: Pattern = Lazy::new(|| Regex::new(r"<[^>]+>"));
static NBSP_RE: Pattern = Lazy::new(|| Regex::new(r"&nbsp;"));
static PUNCTUATION_RE: Pattern = Lazy::new(|| Regex::new(r#"[,.!?"]+"#));
static SYMBOL_RE: Pattern = Lazy::new(|| Regex::new(r"[^\w\s]"));
static DIGITS_RE: Pattern = Lazy::new(|| Regex::new(r"\d+"));
static WHITESPACE_RE: Pattern = Lazy::new(|| Regex::new(r"\s+"));

fn pattern(re: &'static Pattern) -> Result<&'static Regex> {
    Lazy::force(re)
        .as_ref()
        .map_err(|e| SentimentError::Preprocessing(e.to_string()))
}

fn replace(re: &'static Pattern, text: &str, with: &str) -> Result<String> {
    Ok(pattern(re)?.replace_all(text, with).into_owned())
}

/// Cleans raw ticket text (often HTML or e-mail derived) into plain,
/// lowercase, whitespace-normalised text for feature extraction.
///
/// The steps run in a fixed order; see [`TextPreProcessor::try_process_text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPreProcessor;

impl TextPreProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Remove `@media ... { ... }` blocks
    pub fn remove_media_queries(text: &str) -> Result<String> {
        replace(&MEDIA_QUERY_RE, text, "")
    }

    /// Remove inline image references such as `[cid:image001.png@01D...]`
    pub fn remove_cid_images(text: &str) -> Result<String> {
        replace(&CID_IMAGE_RE, text, "")
    }

    /// Replace runs of newlines and carriage returns with a single space
    pub fn remove_newlines(text: &str) -> Result<String> {
        replace(&NEWLINE_RE, text, " ")
    }

    /// Replace HTML tags with a space
    pub fn remove_html_tags(text: &str) -> Result<String> {
        replace(&HTML_TAG_RE, text, " ")
    }

    /// Replace `&nbsp;` entities with a regular space
    pub fn replace_html_spaces(text: &str) -> Result<String> {
        replace(&NBSP_RE, text, " ")
    }

    /// Decode the remaining HTML entities
    pub fn unescape_html(text: &str) -> String {
        html_escape::decode_html_entities(text).into_owned()
    }

    /// Replace punctuation and any other non-word, non-space symbol with a space
    pub fn remove_punctuation(text: &str) -> Result<String> {
        let text = replace(&PUNCTUATION_RE, text, " ")?;
        replace(&SYMBOL_RE, &text, " ")
    }

    /// Replace digit sequences with a space
    pub fn remove_numbers(text: &str) -> Result<String> {
        replace(&DIGITS_RE, text, " ")
    }

    /// Collapse whitespace runs to one space and trim both ends
    pub fn normalize_whitespace(text: &str) -> Result<String> {
        Ok(pattern(&WHITESPACE_RE)?
            .replace_all(text, " ")
            .trim()
            .to_string())
    }

    pub fn to_lowercase(text: &str) -> String {
        text.to_lowercase()
    }

    /// Run every cleaning step, surfacing the first failure
    pub fn try_process_text(text: &str) -> Result<String> {
        let text = Self::remove_media_queries(text)?;
        let text = Self::remove_cid_images(&text)?;
        let text = Self::remove_newlines(&text)?;
        let text = Self::remove_html_tags(&text)?;
        let text = Self::replace_html_spaces(&text)?;
        let text = Self::unescape_html(&text);
        let text = Self::remove_punctuation(&text)?;
        let text = Self::remove_numbers(&text)?;
        let text = Self::normalize_whitespace(&text)?;
        Ok(Self::to_lowercase(&text))
    }

    /// Clean `text`. Never fails: on an internal error the input is
    /// returned unchanged so prediction can still proceed.
    pub fn process_text(text: &str) -> String {
        match Self::try_process_text(text) {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    error = %e,
                    error_code = e.error_code(),
                    "Text preprocessing failed, returning input unchanged"
                );
                text.to_string()
            }
        }
    }

    pub fn process_batch<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
        texts
            .iter()
            .map(|text| Self::process_text(text.as_ref()))
            .collect()
    }
}
