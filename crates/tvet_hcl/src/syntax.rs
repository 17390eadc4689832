//! Cheap syntactic plausibility checks, usable before full extraction.

use regex::Regex;
use tracing::warn;

/// Scans text for obvious syntax problems: unbalanced braces, unbalanced
/// quotes, and the absence of any recognizable top-level block. Returns an
/// empty list when the text looks plausible. This is a heuristic gate, not
/// a grammar check.
pub fn check_syntax(text: &str) -> Vec<String> {
    let mut errors = Vec::new();

    let open = text.matches('{').count();
    let close = text.matches('}').count();
    if open != close {
        errors.push(format!(
            "Unbalanced braces: {open} opening, {close} closing"
        ));
    }

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }
        if unescaped_quotes(line) % 2 != 0 {
            errors.push(format!("Unbalanced quotes on line {}", index + 1));
        }
    }

    match Regex::new(r"(resource|variable|output|provider|terraform|locals|module|data)\s") {
        Ok(blocks) => {
            if !text.trim().is_empty() && !blocks.is_match(text) {
                errors.push("No recognizable Terraform blocks found".to_string());
            }
        }
        Err(err) => warn!(error = %err, "invalid block pattern"),
    }

    errors
}

fn unescaped_quotes(line: &str) -> usize {
    let mut count = 0;
    let mut previous = '\0';
    for ch in line.chars() {
        if ch == '"' && previous != '\\' {
            count += 1;
        }
        previous = ch;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_document() {
        let text = "resource \"aws_s3_bucket\" \"data\" {\n  bucket = \"x\"\n}\n";
        assert!(check_syntax(text).is_empty());
    }

    #[test]
    fn test_unbalanced_braces() {
        let errors = check_syntax("resource \"aws_s3_bucket\" \"data\" {\n");
        assert!(errors.iter().any(|e| e.contains("Unbalanced braces")));
    }

    #[test]
    fn test_unbalanced_quotes() {
        let errors = check_syntax("resource \"aws_s3_bucket \"data\" {\n}\n");
        assert!(errors.iter().any(|e| e.contains("line 1")));
    }

    #[test]
    fn test_comment_quotes_ignored() {
        let text = "# it's \"quoted\n// also \"this\nresource \"x\" \"y\" {\n}\n";
        assert!(check_syntax(text).is_empty());
    }

    #[test]
    fn test_no_terraform_blocks() {
        let errors = check_syntax("just some prose without blocks");
        assert!(errors
            .iter()
            .any(|e| e.contains("No recognizable Terraform blocks")));
    }
}
