//! Text-embedded file writes
//!
//! When an agent will not (or cannot) emit proper tool calls, it is asked
//! to write files as XML blocks in plain text instead:
//!
//! `<write_to_file><path>...</path><content>...</content></write_to_file>`
//!
//! This module turns those blocks into ordinary `write_file` tool calls so
//! the rest of the pipeline does not care which form the agent used.

use swarmguard_core::ToolCall;

const OPEN: &str = "<write_to_file>";
const CLOSE: &str = "</write_to_file>";

/// Parse all `<write_to_file>` blocks from text into `write_file` calls
///
/// Blocks without a `<path>` still produce a call (with an empty path) so the
/// interceptor can repair it; blocks without a closing tag are ignored.
pub fn parse_write_blocks(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find(OPEN) {
        let block_start = start + OPEN.len();

        let Some(end) = remaining[block_start..].find(CLOSE) else {
            break;
        };
        let block = &remaining[block_start..block_start + end];

        let path = extract_tag_content(block, "path")
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
        let content = extract_tag_content(block, "content").unwrap_or_default();
        calls.push(ToolCall::write_file(
            format!("xml_{}", calls.len() + 1),
            &path,
            strip_leading_newline(content),
        ));

        remaining = &remaining[block_start + end + CLOSE.len()..];
    }

    calls
}

/// Extract content between <tag> and </tag>
fn extract_tag_content<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open_tag = format!("<{}>", tag);
    let close_tag = format!("</{}>", tag);

    let start = text.find(&open_tag)? + open_tag.len();
    let end = text[start..].find(&close_tag)?;

    Some(&text[start..start + end])
}

/// Drop the newline right after `<content>`; the one before `</content>` ends the file
fn strip_leading_newline(content: &str) -> &str {
    content.strip_prefix('\n').unwrap_or(content)
}

/// Instructions telling an agent to use XML blocks instead of tool calls
pub fn structured_output_instructions() -> &'static str {
    r#"Do NOT call any tools in this response. Write every file as an XML block in plain text:

<write_to_file>
<path>relative/path/to/file.ext</path>
<content>
complete file content here, no abbreviations
</content>
</write_to_file>

Rules:
- One block per file, all expected files in this single response
- Paths are relative to the project root
- Content must be the COMPLETE file, never a summary or an ellipsis"#
}
