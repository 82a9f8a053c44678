//! HTTP server mode for doc2pdf.
//!
//! Accepts multipart uploads, converts them into the output directory and
//! keeps a log of successful conversions.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use doc2pdf::config::ConvertOptions;
use doc2pdf::error::{ConversionFailure, FailureKind};
use doc2pdf::record::{ConversionRecord, RecordStore};
use doc2pdf::{ConversionRequest, convert};
use tracing::{info, warn};

/// Everything a request handler needs.
pub struct ServerState {
    pub options: ConvertOptions,
    pub upload_dir: PathBuf,
    pub store: Box<dyn RecordStore>,
    /// Request bodies larger than this are refused with 413.
    pub max_upload_bytes: u64,
}

/// Start the HTTP server on the given host and port.
pub fn start_server(host: &str, port: u16, state: ServerState) -> Result<()> {
    let addr = format!("{host}:{port}");
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;

    info!(%addr, "doc2pdf server listening");
    eprintln!("doc2pdf server listening on http://{addr}");
    eprintln!("Endpoints:");
    eprintln!("  GET  /        - Conversion log and upload form");
    eprintln!("  POST /upload  - Upload and convert a document");
    eprintln!("  GET  /files   - Conversion log as JSON");
    eprintln!("  GET  /health  - Health check");

    for mut request in server.incoming_requests() {
        let response = dispatch(&mut request, &state);
        let _ = request.respond(response);
    }

    Ok(())
}

type Response = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

fn with_header(response: Response, field: &str, value: &str) -> Response {
    match tiny_http::Header::from_bytes(field, value) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn json_response(status: i32, body: &str) -> Response {
    with_header(
        tiny_http::Response::from_string(body).with_status_code(status),
        "Content-Type",
        "application/json",
    )
}

fn html_response(status: i32, body: String) -> Response {
    with_header(
        tiny_http::Response::from_string(body).with_status_code(status),
        "Content-Type",
        "text/html; charset=utf-8",
    )
}

fn redirect(location: &str) -> Response {
    with_header(
        tiny_http::Response::from_data(Vec::new()).with_status_code(303),
        "Location",
        location,
    )
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn dispatch(request: &mut tiny_http::Request, state: &ServerState) -> Response {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(&url).to_string();
    let is_get = *request.method() == tiny_http::Method::Get;
    let is_post = *request.method() == tiny_http::Method::Post;

    if is_get && path == "/" {
        handle_index(state)
    } else if is_get && path == "/health" {
        handle_health()
    } else if is_get && path == "/files" {
        handle_files(state)
    } else if is_post && path == "/upload" {
        handle_upload(request, state)
    } else {
        json_response(404, &error_json("not found"))
    }
}

fn handle_health() -> Response {
    let version = env!("CARGO_PKG_VERSION");
    json_response(200, &format!(r#"{{"status":"ok","version":"{version}"}}"#))
}

fn handle_files(state: &ServerState) -> Response {
    match state.store.list() {
        Ok(files) => json_response(200, &serde_json::json!({ "files": files }).to_string()),
        Err(e) => json_response(500, &error_json(&e.to_string())),
    }
}

fn handle_index(state: &ServerState) -> Response {
    match state.store.list() {
        Ok(records) => html_response(200, render_index(&records)),
        Err(e) => html_response(500, format!("<p>{}</p>", escape_html(&e.to_string()))),
    }
}

fn render_index(records: &[ConversionRecord]) -> String {
    let mut rows = String::new();
    for record in records {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&record.file_name),
            record.file_type,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>doc2pdf</title></head>
<body>
<h1>Convert a document to PDF</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept=".docx,.pptx,.xlsx,.csv,.txt,.md">
<button type="submit">Convert</button>
</form>
<h2>Converted files</h2>
<table>
<tr><th>File</th><th>Type</th><th>Converted at</th></tr>
{rows}</table>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn failure_status(kind: FailureKind) -> i32 {
    match kind {
        FailureKind::UnsupportedFormat => 415,
        FailureKind::RenderError | FailureKind::DelegateError => 500,
    }
}

fn handle_upload(request: &mut tiny_http::Request, state: &ServerState) -> Response {
    let file = match read_upload(request, state.max_upload_bytes) {
        Ok(file) => file,
        Err(UploadError::TooLarge(limit)) => {
            warn!(limit, "upload refused: body too large");
            return json_response(413, &error_json(&format!("upload exceeds {limit} bytes")));
        }
        Err(UploadError::Malformed(e)) => return json_response(400, &error_json(&e.to_string())),
    };

    let stored = state.upload_dir.join(&file.filename);
    if let Err(e) = std::fs::write(&stored, &file.data) {
        warn!(path = %stored.display(), error = %e, "failed to store upload");
        return json_response(500, &error_json(&format!("failed to store upload: {e}")));
    }
    info!(file_name = %file.filename, bytes = file.data.len(), "upload stored");

    let conversion_request = ConversionRequest::new(&stored, &file.filename);
    match convert(&conversion_request, &state.options) {
        Ok(conversion) => {
            if let Err(e) = state.store.insert(&conversion.record()) {
                warn!(error = %e, "failed to record conversion");
                return json_response(500, &error_json(&e.to_string()));
            }
            redirect("/")
        }
        Err(e) => {
            let failure = ConversionFailure::from(&e);
            let body = serde_json::to_string(&failure).unwrap_or_else(|_| error_json(&failure.message));
            json_response(failure_status(failure.kind), &body)
        }
    }
}

enum UploadError {
    TooLarge(u64),
    Malformed(anyhow::Error),
}

impl From<anyhow::Error> for UploadError {
    fn from(e: anyhow::Error) -> Self {
        Self::Malformed(e)
    }
}

fn read_upload(
    request: &mut tiny_http::Request,
    limit: u64,
) -> Result<MultipartFile, UploadError> {
    if request.body_length().is_some_and(|len| len as u64 > limit) {
        return Err(UploadError::TooLarge(limit));
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(anyhow::Error::from)?;
    if body.len() as u64 > limit {
        return Err(UploadError::TooLarge(limit));
    }

    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_string())
        .unwrap_or_default();

    let boundary = extract_boundary(&content_type)
        .ok_or_else(|| anyhow::anyhow!("missing or invalid Content-Type boundary"))?;
    let mut file = extract_file_from_multipart(&body, &boundary, "file")
        .ok_or_else(|| anyhow::anyhow!("no file field in multipart body"))?;
    file.filename = sanitize_filename(&file.filename)
        .ok_or_else(|| anyhow::anyhow!("invalid file name: {:?}", file.filename))?;
    Ok(file)
}

// --- Multipart parsing helpers ---

struct MultipartFile {
    filename: String,
    data: Vec<u8>,
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_string())
    })
}

/// Find the part named `field` that carries a file name.
fn extract_file_from_multipart(body: &[u8], boundary: &str, field: &str) -> Option<MultipartFile> {
    let delim = format!("--{boundary}");
    let delim_bytes = delim.as_bytes();

    let mut pos = find_bytes(body, delim_bytes)? + delim_bytes.len();
    loop {
        // closing delimiter
        if body.get(pos..pos + 2) == Some(b"--") {
            return None;
        }
        let start = if body.get(pos..pos + 2) == Some(b"\r\n") {
            pos + 2
        } else {
            pos
        };

        let header_end = find_bytes(&body[start..], b"\r\n\r\n")?;
        let headers = std::str::from_utf8(&body[start..start + header_end]).ok()?;
        let data_start = start + header_end + 4;

        let next_delim_pos = find_bytes(&body[data_start..], delim_bytes)?;
        // data ends before the \r\n that precedes the next delimiter
        let data_end = if next_delim_pos >= 2
            && body[data_start + next_delim_pos - 2..data_start + next_delim_pos] == *b"\r\n"
        {
            data_start + next_delim_pos - 2
        } else {
            data_start + next_delim_pos
        };

        if extract_param_from_headers(headers, "name").as_deref() == Some(field)
            && let Some(filename) = extract_param_from_headers(headers, "filename")
        {
            return Some(MultipartFile {
                filename,
                data: body[data_start..data_end].to_vec(),
            });
        }
        pos = data_start + next_delim_pos + delim_bytes.len();
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Quoted `key="value"` parameter of the Content-Disposition header.
fn extract_param_from_headers(headers: &str, key: &str) -> Option<String> {
    let lower = headers.to_ascii_lowercase();
    let pattern = format!("{key}=\"");
    let mut from = 0;
    while let Some(found) = lower[from..].find(&pattern) {
        let idx = from + found;
        // `name=` must not match the tail of `filename=`
        let preceded_ok = idx == 0 || matches!(lower.as_bytes()[idx - 1], b' ' | b';' | b'\t');
        let start = idx + pattern.len();
        if preceded_ok {
            let rest = &headers[start..];
            let end = rest.find('"')?;
            return Some(rest[..end].to_string());
        }
        from = start;
    }
    None
}

/// Base name of an uploaded file, or `None` when nothing usable remains.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match base {
        "" | "." | ".." => None,
        _ => Some(base.to_string()),
    }
}
