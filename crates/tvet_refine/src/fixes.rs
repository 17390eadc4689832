//! Text transforms behind the fix catalog.
//!
//! Every transform takes the whole document and returns `Some(rewritten)`
//! or `None` when its anchor is absent. Transforms never fail and never
//! touch content outside their anchor.

use regex::Regex;
use tvet_validate::canonical_format;

/// Reindents the document to two-space nesting. `None` when the text is
/// already canonical.
pub fn reindent(text: &str) -> Option<String> {
    let formatted = canonical_format(text);
    if formatted == text {
        None
    } else {
        Some(formatted)
    }
}

/// Inserts an `aws_s3_bucket_public_access_block` after every S3 bucket
/// block. `None` when no bucket exists or a block is already present.
pub fn insert_public_access_block(text: &str) -> Option<String> {
    insert_companion(text, "aws_s3_bucket_public_access_block", |name| {
        format!(
            r#"
resource "aws_s3_bucket_public_access_block" "{name}" {{
  bucket = aws_s3_bucket.{name}.id

  block_public_acls       = true
  block_public_policy     = true
  ignore_public_acls      = true
  restrict_public_buckets = true
}}
"#
        )
    })
}

/// Inserts an `aws_s3_bucket_server_side_encryption_configuration` with
/// an AES256 rule after every S3 bucket block. `None` when no bucket
/// exists or encryption is already configured.
pub fn insert_encryption_config(text: &str) -> Option<String> {
    insert_companion(
        text,
        "aws_s3_bucket_server_side_encryption_configuration",
        |name| {
            format!(
                r#"
resource "aws_s3_bucket_server_side_encryption_configuration" "{name}" {{
  bucket = aws_s3_bucket.{name}.id

  rule {{
    apply_server_side_encryption_by_default {{
      sse_algorithm = "AES256"
    }}
  }}
}}
"#
            )
        },
    )
}

/// Rewrites the name label of every `resource`/`data` block header to
/// snake_case and updates references to the renamed resources. `None`
/// when the document has no block headers.
pub fn snake_case_names(text: &str) -> Option<String> {
    let header = match Regex::new(r#"((?:resource|data)\s+"([a-zA-Z0-9_]+)"\s+")([A-Za-z0-9_-]+)(")"#)
    {
        Ok(re) => re,
        Err(_) => return None,
    };
    let mut found_header = false;
    let mut renames: Vec<(String, String, String)> = Vec::new();
    let rewritten = header.replace_all(text, |caps: &regex::Captures<'_>| {
        found_header = true;
        let snake = to_snake_case(&caps[3]);
        if snake != caps[3] {
            renames.push((caps[2].to_string(), caps[3].to_string(), snake.clone()));
        }
        format!("{}{}{}", &caps[1], snake, &caps[4])
    });
    if !found_header {
        return None;
    }
    let mut result = rewritten.into_owned();
    for (resource_type, old, new) in renames {
        let pattern = format!(
            r"\b{}\.{}\b",
            regex::escape(&resource_type),
            regex::escape(&old)
        );
        if let Ok(re) = Regex::new(&pattern) {
            result = re
                .replace_all(&result, format!("{resource_type}.{new}"))
                .into_owned();
        }
    }
    Some(result)
}

fn insert_companion(
    text: &str,
    companion_type: &str,
    template: impl Fn(&str) -> String,
) -> Option<String> {
    if text.contains(companion_type) {
        return None;
    }
    let blocks = bucket_blocks(text);
    if blocks.is_empty() {
        return None;
    }
    let mut result = text.to_string();
    for (name, insert_at) in blocks.into_iter().rev() {
        result.insert_str(insert_at, &template(&name));
    }
    Some(result)
}

/// Locates every `aws_s3_bucket` block and the byte offset just past the
/// line holding its closing brace.
fn bucket_blocks(text: &str) -> Vec<(String, usize)> {
    let header = match Regex::new(r#"resource\s+"aws_s3_bucket"\s+"([A-Za-z0-9_-]+)"\s*\{"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let mut blocks = Vec::new();
    for caps in header.captures_iter(text) {
        let name = caps[1].to_string();
        let open = match caps.get(0) {
            Some(m) => m.end() - 1,
            None => continue,
        };
        if let Some(close) = matching_brace(text, open) {
            let insert_at = text[close..]
                .find('\n')
                .map(|offset| close + offset + 1)
                .unwrap_or(text.len());
            blocks.push((name, insert_at));
        }
    }
    blocks
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut index = open;
    while index < bytes.len() {
        match bytes[index] {
            b'"' => in_string = !in_string,
            b'\\' if in_string => index += 1,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}

fn to_snake_case(name: &str) -> String {
    let mut out = name.to_string();
    if let Ok(re) = Regex::new(r"(.)([A-Z][a-z]+)") {
        out = re.replace_all(&out, "${1}_${2}").into_owned();
    }
    if let Ok(re) = Regex::new(r"([a-z0-9])([A-Z])") {
        out = re.replace_all(&out, "${1}_${2}").into_owned();
    }
    out.to_lowercase()
}
