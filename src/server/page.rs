//! HTML for the upload form and results.

use std::fmt::Write as _;

use crate::{analysis::SceneReport, preview::Preview};

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em}\
.error{color:#b00020}\
.change{margin:1.5em 0}\
.change img{max-width:100%;border:0}\
.unavailable{color:#666;font-style:italic}";

/// The empty upload form.
pub fn index_page(threshold: f64) -> String {
    render(threshold, None, None)
}

/// The upload form with an error message.
pub fn error_page(threshold: f64, message: &str) -> String {
    render(threshold, Some(message), None)
}

/// The upload form followed by the detected changes and their previews.
pub fn results_page(threshold: f64, report: &SceneReport) -> String {
    render(threshold, None, Some(report))
}

fn render(threshold: f64, error: Option<&str>, report: Option<&SceneReport>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Scene Change Detection</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<h1>Scene Change Detection</h1>\n");

    html.push_str("<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n");
    html.push_str("<input type=\"file\" name=\"video\" accept=\"video/*\">\n");
    let _ = writeln!(
        html,
        "<label>Threshold <input type=\"number\" name=\"threshold\" min=\"0\" step=\"any\" value=\"{threshold}\"></label>"
    );
    html.push_str("<button type=\"submit\">Upload and Process</button>\n</form>\n");

    if let Some(message) = error {
        let _ = writeln!(html, "<p class=\"error\">{}</p>", escape_html(message));
    }

    if let Some(report) = report {
        render_results(&mut html, report);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_results(html: &mut String, report: &SceneReport) {
    html.push_str("<h2>Scene Changes</h2>\n");
    if report.changes.is_empty() {
        html.push_str("<p>No scene changes detected.</p>\n");
        return;
    }

    for (change, preview) in report.entries() {
        html.push_str("<div class=\"change\">\n");
        let _ = writeln!(
            html,
            "<h3>Frame {}</h3>\n<p>Timestamp: {:.2} seconds</p>",
            change.frame_index, change.timestamp_seconds
        );
        match preview {
            Preview::Rendered(image) => {
                let _ = writeln!(
                    html,
                    "<img src=\"{}\" width=\"{}\" height=\"{}\" alt=\"{}\">",
                    image.data_uri(),
                    image.width,
                    image.height,
                    escape_html(&image.caption)
                );
            }
            Preview::Unavailable { reason, .. } => {
                let _ = writeln!(
                    html,
                    "<p class=\"unavailable\">Preview unavailable: {}</p>",
                    escape_html(reason)
                );
            }
        }
        html.push_str("</div>\n");
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
