/// Integration tests for the text preprocessing chain
///
/// Covers the cleaning steps on realistic e-mail / HTML tickets and the
/// file-backed greeting and stop word filters.

use std::fs;
use tempfile::TempDir;
use ticat_sentiment::config::Config;
use ticat_sentiment::{GreetingFilter, SentimentAnalyzer, SentimentError, StopwordFilter, TextPreProcessor};

const HTML_TICKET: &str = r#"<html><head><style>@media only screen and (max-width: 600px) { .body { width: 100% !important; } }</style></head>
<body><p>Hallo&nbsp;Team,</p>
<p>leider funktioniert der Export seit 3 Tagen nicht &amp; ich bin genervt!</p>
[cid:image001.png@01D8A1B2.C3D4E5F0]
<p>Mit freundlichen Grüßen</p><p>Erika Mustermann</p></body></html>"#;

#[test]
fn test_html_ticket_is_cleaned() {
    let cleaned = TextPreProcessor::process_text(HTML_TICKET);
    assert_eq!(
        cleaned,
        "hallo team leider funktioniert der export seit tagen nicht ich bin genervt mit freundlichen grüßen erika mustermann"
    );
}

#[test]
fn test_cleaning_is_idempotent() {
    let once = TextPreProcessor::process_text(HTML_TICKET);
    assert_eq!(TextPreProcessor::process_text(&once), once);
}

#[test]
fn test_batch_matches_single() {
    let texts = ["Hello!! 123 World", "<b>Bold</b>   move"];
    let batch = TextPreProcessor::process_batch(&texts);
    assert_eq!(batch, vec!["hello world".to_string(), "bold move".to_string()]);
}

#[test]
fn test_empty_and_whitespace_input() {
    assert_eq!(TextPreProcessor::process_text(""), "");
    assert_eq!(TextPreProcessor::process_text("  \n\r\t "), "");
    assert_eq!(TextPreProcessor::process_text("12 345 !!!"), "");
}

#[test]
fn test_filters_loaded_from_config_files() {
    let dir = TempDir::new().unwrap();
    let greetings = dir.path().join("greetings.txt");
    fs::write(&greetings, "\"Mit freundlichen Grüßen\",\nBest regards\n\n").unwrap();
    let stopwords = dir.path().join("stopwords.yaml");
    fs::write(&stopwords, "domain:\n  - hallo\n  - team\n").unwrap();

    let mut config = Config::default();
    config.paths.project_root = dir.path().to_path_buf();
    config.preprocessing.greetings_file = Some(greetings);
    config.preprocessing.stopwords_file = Some(stopwords);
    config.preprocessing.stopwords_key = "domain".to_string();

    let analyzer = SentimentAnalyzer::from_config(&config).unwrap();
    assert_eq!(
        analyzer.prepare(HTML_TICKET),
        "leider funktioniert der export seit tagen nicht ich bin genervt"
    );
}

#[test]
fn test_missing_filter_files_fail_construction() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.paths.project_root = dir.path().to_path_buf();
    config.preprocessing.greetings_file = Some(dir.path().join("missing.txt"));

    assert!(matches!(
        SentimentAnalyzer::from_config(&config),
        Err(SentimentError::GreetingsFileMissing(_))
    ));

    assert!(matches!(
        StopwordFilter::load(dir.path().join("missing.yaml"), "stopwords"),
        Err(SentimentError::StopwordsFileMissing(_))
    ));
}

#[test]
fn test_greeting_filter_first_sequence_wins() {
    let filter = GreetingFilter::from_sequences(["viele grüße", "danke"]);
    let text = TextPreProcessor::process_text("Danke für nichts. Viele Grüße, Max");
    assert_eq!(filter.cut_after_greetings(&text), "danke für nichts");
}

#[test]
fn test_tagged_input_leaves_no_angle_brackets() {
    for input in [
        "<div>hi</div>",
        "<a href=\"x\">link</a> and <span class='c'>more</span>",
        "a < b but <b>bold</b> > c",
    ] {
        let cleaned = TextPreProcessor::process_text(input);
        assert!(!cleaned.contains('<') && !cleaned.contains('>'), "{:?}", cleaned);
    }
}
