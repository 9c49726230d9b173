//! `mockwire play`: play a fixture through the delivery engine.
//!
//! Prints one line per callback on stdout, either as text or as JSON. With
//! `--cancel-after N` the printing client cancels the exchange from inside
//! its N-th data callback, the way a real client abandons a download.
//! `--cancel-after 0` cancels from the response callback, before any data.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;
use mockwire_delivery::{
    DeliveryClient, DeliveryEngine, DeliveryHandle, HeaderMap, TokioScheduler, TransportError,
};
use serde_json::json;
use tokio::sync::watch;
use tracing::info;

use crate::fixture::Fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Format::Json,
            _ => Format::Text,
        }
    }
}

pub async fn play(path: &Path, handle: u64, cancel_after: Option<usize>, format: &str) -> Result<()> {
    let fixture = Fixture::from_file(path)?;
    let spec = fixture.to_spec()?;

    info!(fixture = %path.display(), handle, "playing fixture");
    let client = Arc::new(PrintingClient::new(
        std::io::stdout(),
        Format::parse(format),
        cancel_after,
    ));
    let engine = Arc::new(DeliveryEngine::new(TokioScheduler::current()?));
    client.attach(Arc::clone(&engine));

    engine.begin_delivery(spec, DeliveryHandle::from_raw(handle), client.clone())?;
    client.wait().await;

    info!(state = ?engine.state(), "playback done");
    Ok(())
}

/// Writes every callback as a line to `out`.
pub struct PrintingClient<W> {
    out: Mutex<W>,
    format: Format,
    cancel_after: Option<usize>,
    engine: OnceLock<Arc<DeliveryEngine>>,
    chunks_seen: AtomicUsize,
    done: watch::Sender<bool>,
}

impl<W: Write + Send> PrintingClient<W> {
    pub fn new(out: W, format: Format, cancel_after: Option<usize>) -> Self {
        Self {
            out: Mutex::new(out),
            format,
            cancel_after,
            engine: OnceLock::new(),
            chunks_seen: AtomicUsize::new(0),
            done: watch::Sender::new(false),
        }
    }

    /// Give the client the engine it should cancel.
    pub fn attach(&self, engine: Arc<DeliveryEngine>) {
        let _ = self.engine.set(engine);
    }

    /// Wait for a terminal callback or for the client's own cancellation.
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, text: String, value: serde_json::Value) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let line = match self.format {
            Format::Text => text,
            Format::Json => value.to_string(),
        };
        // A closed stdout only loses output; the exchange still completes.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    fn finish(&self) {
        self.done.send_replace(true);
    }

    fn cancel(&self, handle: DeliveryHandle, seen: usize) {
        if let Some(engine) = self.engine.get() {
            engine.cancel_delivery();
        }
        self.emit(
            format!("{handle} cancelled after {seen} chunks"),
            json!({ "event": "cancelled", "handle": handle.as_raw(), "chunks": seen }),
        );
        self.finish();
    }
}

impl<W: Write + Send> DeliveryClient for PrintingClient<W> {
    fn on_response_received(&self, handle: DeliveryHandle, status: u16, headers: &HeaderMap) {
        let mut text = format!("{handle} response {status}");
        for h in headers.iter() {
            text.push_str(&format!("\n{handle}   {}: {}", h.name, h.value));
        }
        let header_json: serde_json::Map<String, serde_json::Value> = headers
            .iter()
            .map(|h| (h.name.clone(), json!(h.value)))
            .collect();
        self.emit(
            text,
            json!({ "event": "response", "handle": handle.as_raw(), "status": status, "headers": header_json }),
        );

        if self.cancel_after == Some(0) {
            self.cancel(handle, 0);
        }
    }

    fn on_data_received(&self, handle: DeliveryHandle, data: bytes::Bytes) {
        let seen = self.chunks_seen.fetch_add(1, Ordering::SeqCst) + 1;
        let shown = preview(&data);
        self.emit(
            format!("{handle} data {} bytes {shown:?}", data.len()),
            json!({ "event": "data", "handle": handle.as_raw(), "len": data.len(), "data": shown }),
        );

        if self.cancel_after == Some(seen) {
            self.cancel(handle, seen);
        }
    }

    fn on_finished(&self, handle: DeliveryHandle) {
        self.emit(
            format!("{handle} finished"),
            json!({ "event": "finished", "handle": handle.as_raw() }),
        );
        self.finish();
    }

    fn on_failed(&self, handle: DeliveryHandle, error: &TransportError) {
        let text = match error.code() {
            Some(code) => format!("{handle} failed: {error} (code {code})"),
            None => format!("{handle} failed: {error}"),
        };
        self.emit(
            text,
            json!({ "event": "failed", "handle": handle.as_raw(), "error": error.message(), "code": error.code() }),
        );
        self.finish();
    }
}

const PREVIEW_MAX: usize = 32;

/// Lossy UTF-8 rendering of the first few bytes of a chunk.
fn preview(data: &[u8]) -> String {
    let end = data.len().min(PREVIEW_MAX);
    let mut text = String::from_utf8_lossy(&data[..end]).into_owned();
    if data.len() > PREVIEW_MAX {
        text.push('…');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockwire_delivery::{ManualScheduler, ResponseSpec};

    fn run(spec: ResponseSpec, format: Format, cancel_after: Option<usize>) -> String {
        let sched = ManualScheduler::new();
        let engine = Arc::new(DeliveryEngine::new(sched.clone()));
        let client = Arc::new(PrintingClient::new(Vec::new(), format, cancel_after));
        client.attach(Arc::clone(&engine));

        engine
            .begin_delivery(spec, DeliveryHandle::from_raw(9), client.clone())
            .unwrap();
        sched.run_all();
        drop(engine);

        let client = Arc::try_unwrap(client).ok().expect("client still shared");
        String::from_utf8(client.into_inner()).unwrap()
    }

    #[test]
    fn text_output_lists_each_event() {
        let headers = HeaderMap::new().with("Content-Type", "text/plain");
        let out = run(ResponseSpec::chunked(200, headers, "hello world", 2), Format::Text, None);
        assert_eq!(
            out,
            "#9 response 200\n#9   Content-Type: text/plain\n#9 data 6 bytes \"hello \"\n#9 data 5 bytes \"world\"\n#9 finished\n"
        );
    }

    #[test]
    fn json_output_is_one_object_per_line() {
        let out = run(ResponseSpec::error(TransportError::with_code(-1001, "timed out")), Format::Json, None);
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "failed");
        assert_eq!(lines[0]["code"], -1001);
        assert_eq!(lines[0]["handle"], 9);
    }

    #[test]
    fn cancel_after_stops_the_stream() {
        let out = run(
            ResponseSpec::chunked(200, HeaderMap::new(), "abcdef", 3),
            Format::Text,
            Some(2),
        );
        assert!(out.contains("#9 cancelled after 2 chunks"));
        assert!(!out.contains("finished"));
        assert_eq!(out.matches(" data ").count(), 2);
    }

    #[test]
    fn cancel_after_zero_stops_before_any_data() {
        let out = run(
            ResponseSpec::chunked(200, HeaderMap::new(), "abcdef", 3),
            Format::Text,
            Some(0),
        );
        assert_eq!(out, "#9 response 200\n#9 cancelled after 0 chunks\n");
    }

    #[test]
    fn cancel_after_zero_on_an_error_response_is_a_plain_failure() {
        let out = run(ResponseSpec::error("offline"), Format::Text, Some(0));
        assert_eq!(out, "#9 failed: offline\n");
    }

    #[test]
    fn preview_truncates_long_chunks() {
        assert_eq!(preview(b"short"), "short");
        let long = vec![b'a'; 40];
        assert_eq!(preview(&long), format!("{}…", "a".repeat(32)));
    }

    #[test]
    fn format_parse_defaults_to_text() {
        assert_eq!(Format::parse("json"), Format::Json);
        assert_eq!(Format::parse("yaml"), Format::Text);
    }
}
