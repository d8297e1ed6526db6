//! Extraction of Python code embedded in shell scripts.
//!
//! Two embedding forms are recognised:
//! - inline programs: `python -c "<code>"` / `python3 -c '<code>'`
//! - here-documents delimited by `EOF` or `PYTHON` (`<<EOF`, `<<-'PYTHON'`, ...)
//!
//! Invocations of `.py` files are reported as references only; the files
//! are never opened.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // python [flags] -c "..." (the opening quote is captured, the body is scanned by hand)
    static ref INLINE_RE: Regex =
        Regex::new(r#"\bpython[0-9.]*(?:\s+-[A-Za-z]+)*?\s+-c\s+(["'])"#).unwrap();
    // <<EOF, <<-EOF, << 'EOF', <<"PYTHON"
    static ref HEREDOC_RE: Regex =
        Regex::new(r#"<<(-?)[ \t]*["']?(EOF|PYTHON)\b["']?"#).unwrap();
    // python [flags] path/to/script.py
    static ref SCRIPT_RE: Regex =
        Regex::new(r"\bpython[0-9.]*(?:\s+-[A-Za-z]+)*\s+([^\s>|&;'\x22]+\.py)\b").unwrap();
}

/// How a block was embedded in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSource {
    /// `python -c '<code>'`
    Inline,
    /// Here-document with the given marker.
    Heredoc { marker: String },
}

/// One chunk of Python source lifted out of a shell script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    pub source: BlockSource,
    /// 1-indexed line where the code starts in the script.
    pub line: usize,
    pub code: String,
}

/// A `python path/to/script.py` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReference {
    pub path: String,
    /// 1-indexed line of the invocation.
    pub line: usize,
}

/// Extract every embedded Python block, in source order.
pub fn extract_blocks(script: &str) -> Vec<EmbeddedBlock> {
    let heredocs = heredoc_blocks(script);

    let mut blocks: Vec<(usize, EmbeddedBlock)> = heredocs
        .iter()
        .map(|(span, block)| (span.0, block.clone()))
        .collect();

    for (start, block) in inline_blocks(script) {
        // A `python -c` inside a captured heredoc belongs to that heredoc.
        let nested = heredocs
            .iter()
            .any(|((from, to), _)| start >= *from && start < *to);
        if !nested {
            blocks.push((start, block));
        }
    }

    blocks.sort_by_key(|(start, _)| *start);
    blocks.into_iter().map(|(_, block)| block).collect()
}

/// Find `python something.py` invocations and log them.
pub fn script_references(script: &str) -> Vec<ScriptReference> {
    SCRIPT_RE
        .captures_iter(script)
        .filter_map(|caps| {
            let path = caps.get(1)?;
            let reference = ScriptReference {
                path: path.as_str().to_string(),
                line: line_at(script, path.start()),
            };
            tracing::info!(
                path = %reference.path,
                line = reference.line,
                "found reference to python script"
            );
            Some(reference)
        })
        .collect()
}

/// Here-document bodies with the byte span (opener to closing line) they cover.
fn heredoc_blocks(script: &str) -> Vec<((usize, usize), EmbeddedBlock)> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(caps) = HEREDOC_RE.captures_at(script, pos) {
        let Some(opener) = caps.get(0) else {
            break;
        };
        let strip_tabs = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let marker = caps.get(2).map(|m| m.as_str()).unwrap_or("EOF");

        // The body starts on the line after the opener.
        let Some(newline) = script[opener.end()..].find('\n') else {
            break;
        };
        let body_start = opener.end() + newline + 1;

        match find_closing_line(script, body_start, marker, strip_tabs) {
            Some((close_start, close_end)) => {
                let body = script[body_start..close_start]
                    .strip_suffix('\n')
                    .unwrap_or(&script[body_start..close_start]);
                let body = body.strip_suffix('\r').unwrap_or(body);
                let code = if strip_tabs {
                    body.split('\n')
                        .map(|line| line.trim_start_matches('\t'))
                        .collect::<Vec<_>>()
                        .join("\n")
                } else {
                    body.to_string()
                };
                if !code.trim().is_empty() {
                    blocks.push((
                        (opener.start(), close_end),
                        EmbeddedBlock {
                            source: BlockSource::Heredoc {
                                marker: marker.to_string(),
                            },
                            line: line_at(script, body_start),
                            code,
                        },
                    ));
                }
                pos = close_end;
            }
            None => {
                tracing::debug!(marker, line = line_at(script, opener.start()), "unterminated heredoc");
                pos = opener.end();
            }
        }
    }

    blocks
}

/// Byte range of the first line at or after `from` consisting of `marker`.
fn find_closing_line(
    script: &str,
    from: usize,
    marker: &str,
    strip_tabs: bool,
) -> Option<(usize, usize)> {
    let mut line_start = from;
    while line_start < script.len() {
        let line_end = script[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(script.len());
        let mut line = script[line_start..line_end].trim_end_matches('\r');
        if strip_tabs {
            line = line.trim_start_matches('\t');
        }
        if line == marker {
            return Some((line_start, line_end));
        }
        line_start = line_end + 1;
    }
    None
}

/// `python -c` programs keyed by the offset of the invocation.
fn inline_blocks(script: &str) -> Vec<(usize, EmbeddedBlock)> {
    let mut blocks = Vec::new();
    let mut resume = 0;

    for caps in INLINE_RE.captures_iter(script) {
        let (Some(whole), Some(quote)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < resume {
            continue;
        }

        let quote = quote.as_str();
        let body_start = whole.end();
        let Some(body_len) = quoted_len(&script[body_start..], quote) else {
            continue;
        };
        let code = &script[body_start..body_start + body_len];
        resume = body_start + body_len + quote.len();

        if !code.is_empty() {
            blocks.push((
                whole.start(),
                EmbeddedBlock {
                    source: BlockSource::Inline,
                    line: line_at(script, body_start),
                    code: code.to_string(),
                },
            ));
        }
    }

    blocks
}

/// Length of a quoted shell word's body up to its closing quote.
///
/// Backslash escapes apply inside double quotes only.
fn quoted_len(rest: &str, quote: &str) -> Option<usize> {
    if quote == "'" {
        return rest.find('\'');
    }

    let mut escaped = false;
    for (i, ch) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn line_at(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}
