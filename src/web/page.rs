// HTML rendering for the single-page UI

use std::fmt::{self, Write};

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::qa::Answer;
use crate::session::DocumentSummary;

pub const TITLE: &str = "IDontReadPDFs – Let AI Read for You!";

/// Everything the page shows for one response
#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub document: Option<&'a DocumentSummary>,
    pub status: Option<&'a str>,
    pub error: Option<&'a str>,
    pub question: Option<&'a str>,
    pub answer: Option<&'a Answer>,
    pub show_sources: bool,
}

#[inline]
pub fn render(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(4096);
    // Writing into a String cannot fail
    let _ = write_page(&mut html, view);
    html
}

fn write_page(out: &mut String, view: &PageView<'_>) -> fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>📚 IDontReadPDFs</title>")?;
    writeln!(out, "<style>{STYLE}</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>📄 {}</h1>", encode_text(TITLE))?;

    if let Some(error) = view.error {
        writeln!(out, "<div class=\"banner error\">{}</div>", encode_text(error))?;
    }
    if let Some(status) = view.status {
        writeln!(out, "<div class=\"banner status\">{}</div>", encode_text(status))?;
    }

    write_upload_form(out, view.document)?;

    if let Some(document) = view.document {
        write_question_form(out, view)?;
        if document.chunk_count == 0 {
            writeln!(
                out,
                "<p class=\"hint\">No text could be extracted from this PDF.</p>"
            )?;
        }
    }

    if let Some(answer) = view.answer {
        write_answer(out, answer, view.show_sources)?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn write_upload_form(out: &mut String, document: Option<&DocumentSummary>) -> fmt::Result {
    writeln!(
        out,
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">"
    )?;
    writeln!(out, "<label for=\"file\">Upload your PDF</label>")?;
    writeln!(
        out,
        "<input type=\"file\" id=\"file\" name=\"file\" accept=\".pdf,application/pdf\" required>"
    )?;
    writeln!(out, "<button type=\"submit\">Upload</button>")?;
    writeln!(out, "</form>")?;

    if let Some(document) = document {
        writeln!(
            out,
            "<p class=\"meta\">Loaded <strong>{}</strong>: {} pages, {} chunks (uploaded {})</p>",
            encode_text(&document.file_name),
            document.page_count,
            document.chunk_count,
            document.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
    }
    Ok(())
}

fn write_question_form(out: &mut String, view: &PageView<'_>) -> fmt::Result {
    writeln!(out, "<form action=\"/ask\" method=\"post\">")?;
    writeln!(out, "<label for=\"question\">Ask a question about the PDF:</label>")?;
    writeln!(
        out,
        "<input type=\"text\" id=\"question\" name=\"question\" value=\"{}\" autofocus>",
        encode_double_quoted_attribute(view.question.unwrap_or_default())
    )?;
    writeln!(
        out,
        "<label><input type=\"checkbox\" name=\"show_sources\" value=\"on\"{}> \
         Show sources</label>",
        if view.show_sources { " checked" } else { "" }
    )?;
    writeln!(out, "<button type=\"submit\">Ask</button>")?;
    writeln!(out, "</form>")
}

fn write_answer(out: &mut String, answer: &Answer, show_sources: bool) -> fmt::Result {
    writeln!(out, "<section class=\"answer\">")?;
    writeln!(out, "<h3>🤖 Answer:</h3>")?;
    writeln!(out, "<p>{}</p>", encode_text(&answer.text))?;

    if show_sources && !answer.sources.is_empty() {
        writeln!(out, "<details>")?;
        writeln!(out, "<summary>Sources ({})</summary>", answer.sources.len())?;
        writeln!(out, "<ol>")?;
        for source in &answer.sources {
            writeln!(
                out,
                "<li><p class=\"meta\">Page {} · chunk {} · distance {:.4}</p><pre>{}</pre></li>",
                source.chunk.page + 1,
                source.chunk.chunk_index,
                source.distance,
                encode_text(&source.chunk.content)
            )?;
        }
        writeln!(out, "</ol>")?;
        writeln!(out, "</details>")?;
    }

    writeln!(out, "</section>")
}

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
form{margin:1rem 0}input[type=text]{width:100%;padding:.4rem}\
.banner{padding:.6rem;border-radius:4px;margin:1rem 0}\
.error{background:#fde2e1;color:#8a1c1c}.status{background:#e3f4e1;color:#1f5f1c}\
.meta{color:#666;font-size:.9rem}pre{white-space:pre-wrap;background:#f6f6f6;padding:.5rem}";
