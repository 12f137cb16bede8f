use crate::event::OwnedEvent;
use crate::types::{Header, ParsedMessage, ParserMode};

/// Serialize parsed messages to a JSON array.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(messages: &[ParsedMessage], pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(messages)
    } else {
        serde_json::to_string(messages)
    };
    result.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// One compact JSON object per event, newline-terminated.
pub fn format_events_jsonl(events: &[OwnedEvent]) -> String {
    let mut out = String::with_capacity(events.len() * 48);
    for event in events {
        match serde_json::to_string(event) {
            Ok(line) => out.push_str(&line),
            Err(e) => out.push_str(&format!("{{\"error\": \"{e}\"}}")),
        }
        out.push('\n');
    }
    out
}

/// Render a parsed message in a human-readable debug format.
pub fn format_debug(message: &ParsedMessage, mode: ParserMode) -> String {
    let meta = &message.metadata;
    let mut out = String::with_capacity(256);

    match mode {
        ParserMode::Request => {
            out.push_str("=== HTTP Request ===\n");
            out.push_str(&format!("Method:  {}\n", String::from_utf8_lossy(&meta.method)));
            out.push_str(&format!("URL:     {}\n", String::from_utf8_lossy(&meta.url)));
        }
        ParserMode::Response => {
            out.push_str("=== HTTP Response ===\n");
            out.push_str(&format!(
                "Status:  {} {}\n",
                meta.status_code,
                String::from_utf8_lossy(&meta.status_reason)
            ));
        }
    }
    out.push_str(&format!("Version: HTTP/{}.{}\n", meta.http_major, meta.http_minor));
    out.push_str(&format!("Keep-Alive: {}\n", meta.keep_alive));

    push_fields(&mut out, "Headers", &meta.headers);
    if !meta.trailers.is_empty() {
        push_fields(&mut out, "Trailers", &meta.trailers);
    }

    if message.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", message.body.len()));
        match std::str::from_utf8(&message.body) {
            Ok(s) => out.push_str(s),
            Err(_) => {
                out.push_str(&format!("<binary data: {} bytes>", message.body.len()));
            }
        }
        out.push('\n');
    }

    out.push_str("====================\n");
    out
}

/// Render only the start line and headers (no body).
pub fn format_headers_only(message: &ParsedMessage, mode: ParserMode) -> String {
    let meta = &message.metadata;
    let mut out = String::with_capacity(64 + meta.headers.len() * 40);

    match mode {
        ParserMode::Request => out.push_str(&format!(
            "{} {} HTTP/{}.{}\n",
            String::from_utf8_lossy(&meta.method),
            String::from_utf8_lossy(&meta.url),
            meta.http_major,
            meta.http_minor
        )),
        ParserMode::Response => out.push_str(&format!(
            "HTTP/{}.{} {} {}\n",
            meta.http_major,
            meta.http_minor,
            meta.status_code,
            String::from_utf8_lossy(&meta.status_reason)
        )),
    }

    for header in &meta.headers {
        out.push_str(&format!("{}: {}\n", header.name_str(), header.value_str()));
    }

    out
}

fn push_fields(out: &mut String, title: &str, fields: &[Header]) {
    out.push_str(&format!("\n--- {title} ({}) ---\n", fields.len()));
    for field in fields {
        out.push_str(&format!("  {}: {}\n", field.name_str(), field.value_str()));
    }
}
