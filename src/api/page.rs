// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server-rendered page: upload form, annotated image and tag block

use pulldown_cmark::{html, Parser};

use crate::pipeline::AnalysisReport;
use crate::vision::png_data_url;

pub const PAGE_TITLE: &str = "Image Analysis";

/// Heading line shown above the tag list
pub const TAG_HEADING: &str = "*** contents tag ***";

const ACCEPTED_TYPES: &str = ".jpg,.jpeg,.png,image/jpeg,image/png";

/// Markdown for the tag block: the heading, then the tags as a quote
pub fn tag_markdown(tag_line: &str) -> String {
    format!("{}\n\n> {}\n", TAG_HEADING, tag_line)
}

/// Render markdown to HTML, stripping anything unsafe
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    ammonia::clean(&out)
}

/// Page with only the upload form
pub fn index_page() -> String {
    layout("")
}

/// Page showing the annotated image and its tags below the form
pub fn result_page(report: &AnalysisReport) -> String {
    let body = format!(
        r#"<section class="result">
    <img alt="{alt}" src="{src}" width="{width}" height="{height}">
    <div class="tags">{tags}</div>
</section>"#,
        alt = ammonia::clean_text(&report.blob_name),
        src = png_data_url(&report.annotated_png),
        width = report.width,
        height = report.height,
        tags = markdown_to_html(&tag_markdown(&report.tag_line)),
    );
    layout(&body)
}

/// Page reporting a failed run below the form
pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<section class="error"><p>{}</p></section>"#,
        ammonia::clean_text(message)
    );
    layout(&body)
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 960px; margin: 2rem auto; }}
        img {{ max-width: 100%; height: auto; }}
        blockquote {{ border-left: 4px solid #ccc; margin-left: 0; padding-left: 1rem; }}
        .error {{ color: #b00020; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <form action="/analyze" method="post" enctype="multipart/form-data">
        <label for="file">Choose an image...</label>
        <input id="file" type="file" name="file" accept="{accept}" required>
        <button type="submit">Analyze</button>
    </form>
    {body}
</body>
</html>
"#,
        title = PAGE_TITLE,
        accept = ACCEPTED_TYPES,
        body = body,
    )
}
