//! HTML directory index.

use chrono::{DateTime, Local};
use std::io;
use std::path::Path;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

/// One row of a directory index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Read `dir` into index rows, sorted case-insensitively by name.
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut stream = ReadDirStream::new(tokio::fs::read_dir(dir).await?);
    let mut entries = Vec::new();

    while let Some(entry) = stream.next().await {
        let entry = entry?;
        // Follow symlinks; fall back to the link itself when it dangles
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(metadata) => metadata,
            Err(_) => entry.metadata().await?,
        };

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

/// Render the index page for `request_path` (already percent-decoded)
pub fn render(request_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(request_path));

    let mut html = String::with_capacity(512 + entries.len() * 128);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n<hr>\n<table>\n", title));
    html.push_str("<tr><th>Name</th><th>Size</th><th>Last modified</th></tr>\n");

    if request_path != "/" {
        html.push_str("<tr><td><a href=\"../\">../</a></td><td>-</td><td></td></tr>\n");
    }

    for entry in entries {
        let (display, href, size) = if entry.is_dir {
            (
                format!("{}/", entry.name),
                format!("{}/", urlencoding::encode(&entry.name)),
                "-".to_string(),
            )
        } else {
            (
                entry.name.clone(),
                urlencoding::encode(&entry.name).into_owned(),
                entry.size.to_string(),
            )
        };
        let modified = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        html.push_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
            href,
            escape_html(&display),
            size,
            modified
        ));
    }

    html.push_str("</table>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
