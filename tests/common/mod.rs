//! Common test utilities for sentiment integration tests
//!
//! Builds throwaway project directories with JSON-lines training data.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const POSITIVE_TEMPLATES: &[&str] = &[
    "Thank you so much, the support team solved my problem quickly",
    "Great service, the new invoice feature works perfectly",
    "I love the app, everything is easy and fast",
    "Excellent help from your colleague, very friendly and competent",
    "The export works now, wonderful job and many thanks",
];

pub const NEGATIVE_TEMPLATES: &[&str] = &[
    "The login is broken again and nobody answers my tickets",
    "Terrible experience, the invoice export crashes every time",
    "I am very angry, you charged my card twice without reason",
    "Awful support, waiting for days and still no solution",
    "The app is slow and buggy, I want a refund immediately",
];

/// Project root with `data/training_data.jsonl` holding `n_per_class`
/// examples of each label
pub fn project_with_data(n_per_class: usize) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let lines = training_lines(n_per_class);
    write_data_file(dir.path(), &lines);
    dir
}

pub fn training_lines(n_per_class: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(n_per_class * 2);
    for i in 0..n_per_class {
        let positive = POSITIVE_TEMPLATES[i % POSITIVE_TEMPLATES.len()];
        let negative = NEGATIVE_TEMPLATES[i % NEGATIVE_TEMPLATES.len()];
        lines.push(record(&format!("{} (ticket {})", positive, i), "POSITIVE"));
        lines.push(record(&format!("{} (ticket {})", negative, i), "NEGATIVE"));
    }
    lines
}

pub fn record(text: &str, label: &str) -> String {
    serde_json::json!({ "text": text, "label": label }).to_string()
}

/// Write raw lines to `<root>/data/training_data.jsonl`
pub fn write_data_file(root: &Path, lines: &[String]) -> PathBuf {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).expect("data dir");
    let path = data_dir.join("training_data.jsonl");
    let mut file = fs::File::create(&path).expect("data file");
    for line in lines {
        writeln!(file, "{}", line).expect("write line");
    }
    path
}
