//! Access-log boundary
//!
//! Transport-agnostic request logging: wrap a response writer, run the
//! downstream handler, then emit one `Request` record with an `http` group
//! describing the exchange. No HTTP stack is pulled in; servers adapt their
//! request/response types to `AccessRequest` and `ResponseWriter`.

use crate::constants::{HEADER_FORWARDED_FOR, HEADER_NOOP, HEADER_USERNAME};
use crate::error::{LogError, Result};
use crate::level::Level;
use crate::logger::Logger;
use crate::record::Attr;
use chrono::{Local, SecondsFormat};
use std::time::Instant;

// =============================================================================
// Request summary
// =============================================================================

/// The parts of an HTTP request the access log reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub method: String,
    /// Request target as received (`/path?query`)
    pub uri: String,
    /// `Host` header / authority
    pub host: String,
    /// Peer address, usually `ip:port`
    pub remote_addr: String,
    /// Protocol string, e.g. `HTTP/1.1`
    pub proto: String,
    headers: Vec<(String, String)>,
}

impl AccessRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            host: String::new(),
            remote_addr: String::new(),
            proto: "HTTP/1.1".to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Remove every value of header `name`, returning the first one
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.headers.retain(|(n, v)| {
            if n.eq_ignore_ascii_case(name) {
                removed.get_or_insert_with(|| v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn referer(&self) -> &str {
        self.header("Referer").unwrap_or_default()
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or_default()
    }

    fn proto_major(&self) -> Option<u32> {
        let version = self.proto.strip_prefix("HTTP/")?;
        version.split('.').next()?.parse().ok()
    }
}

// =============================================================================
// Response side
// =============================================================================

/// Response sink handed to the downstream handler
pub trait ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn write_header(&mut self, status: u16);

    fn flush(&mut self) -> Result<()> {
        Err(LogError::Unimplemented {
            capability: "flush",
        })
    }

    /// Server push of `target`
    fn push(&mut self, _target: &str) -> Result<()> {
        Err(LogError::Unimplemented { capability: "push" })
    }
}

/// Wraps a `ResponseWriter`, recording status and body size
pub struct ResponseRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: u16,
    size: usize,
}

impl<'a> ResponseRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: 200,
            size: 0,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl ResponseWriter for ResponseRecorder<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.inner.write(buf)?;
        self.size += written;
        Ok(written)
    }

    fn write_header(&mut self, status: u16) {
        self.inner.write_header(status);
        self.status = status;
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn push(&mut self, target: &str) -> Result<()> {
        self.inner.push(target)
    }
}

// =============================================================================
// Access log
// =============================================================================

/// Which optional fields the record carries, and at what level it is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLogOptions {
    pub include_timing: bool,
    pub include_timestamp: bool,
    pub include_forwarded_for: bool,
    pub level: Level,
}

impl Default for AccessLogOptions {
    fn default() -> Self {
        Self {
            include_timing: true,
            include_timestamp: true,
            include_forwarded_for: false,
            level: Level::INFO,
        }
    }
}

impl AccessLogOptions {
    pub fn timing(mut self, include: bool) -> Self {
        self.include_timing = include;
        self
    }

    pub fn timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    pub fn forwarded_for(mut self, include: bool) -> Self {
        self.include_forwarded_for = include;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// Request logging wrapper around a downstream handler
#[derive(Debug, Clone)]
pub struct AccessLog {
    logger: Logger,
    options: AccessLogOptions,
}

impl AccessLog {
    pub fn new(logger: Logger, options: AccessLogOptions) -> Self {
        Self { logger, options }
    }

    pub fn options(&self) -> AccessLogOptions {
        self.options
    }

    /// Run `next` with a recording writer, then log the exchange.
    ///
    /// The noop header is stripped before `next` sees the request; when it
    /// was present nothing is logged.
    pub fn serve<F>(
        &self,
        request: &mut AccessRequest,
        writer: &mut dyn ResponseWriter,
        next: F,
    ) -> Result<()>
    where
        F: FnOnce(&AccessRequest, &mut ResponseRecorder<'_>),
    {
        let started = Instant::now();
        let timestamp = Local::now();
        let noop = request.remove_header(HEADER_NOOP).is_some();

        let mut recorder = ResponseRecorder::new(writer);
        next(&*request, &mut recorder);
        let (status, size) = (recorder.status(), recorder.size());

        if noop {
            return Ok(());
        }

        let username = match request.header(HEADER_USERNAME) {
            Some(name) if !name.is_empty() => escape_html(name),
            _ => "-".to_string(),
        };

        let uri = if request.proto_major() == Some(2) && request.method == "CONNECT" {
            request.host.as_str()
        } else {
            request.uri.as_str()
        };
        let uri = if uri.is_empty() { "/" } else { uri };

        let http = Attr::group(
            "http",
            [
                Some(Attr::string("host", split_host(&request.remote_addr))),
                Some(Attr::string("username", username)),
                Attr::when(
                    self.options.include_timestamp,
                    Attr::string(
                        "timestamp",
                        timestamp.to_rfc3339_opts(SecondsFormat::Nanos, false),
                    ),
                ),
                Some(Attr::string("method", request.method.as_str())),
                Some(Attr::string("uri", sanitize_uri(uri))),
                Some(Attr::string("proto", request.proto.as_str())),
                Some(Attr::int("status", i64::from(status))),
                Some(Attr::uint("size", size as u64)),
                Some(Attr::string("referer", sanitize_uri(request.referer()))),
                Some(Attr::string(
                    "user-agent",
                    sanitize_user_agent(request.user_agent()),
                )),
                Attr::when(
                    self.options.include_timing,
                    Attr::duration("request-time", started.elapsed()),
                ),
                Attr::when(
                    self.options.include_forwarded_for,
                    Attr::string(
                        "forwarded_for",
                        request.header(HEADER_FORWARDED_FOR).unwrap_or_default(),
                    ),
                ),
            ],
        );

        self.logger.log(self.options.level, "Request", [http])
    }
}

/// Host part of `host:port` / `[v6]:port`; the input unchanged otherwise
fn split_host(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once("]:") {
            Some((host, port)) if !port.contains(':') => host,
            _ => addr,
        };
    }
    match addr.split_once(':') {
        Some((host, port)) if !port.contains(':') => host,
        _ => addr,
    }
}

// =============================================================================
// Sanitizers
// =============================================================================

/// Strip CR/LF, spell NUL as `\0`, turn `+` into a space
pub fn sanitize_user_agent(ua: &str) -> String {
    let mut out = String::with_capacity(ua.len());
    for c in ua.chars() {
        match c {
            '\r' | '\n' => {}
            '\0' => out.push_str("\\0"),
            '+' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

/// Strip CR/LF, spell NUL as `\0`
pub fn sanitize_uri(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    for c in uri.chars() {
        match c {
            '\r' | '\n' => {}
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Escape `<`, `>`, `&`, `'` and `"` as HTML entities
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOptions;
    use crate::sink::{Destination, JsonSink};
    use crate::testing::SharedBuffer;
    use serde_json::Value as JsonValue;
    use std::sync::Arc;

    /// Collects the body; supports flush but not push
    #[derive(Default)]
    struct BodyWriter {
        body: Vec<u8>,
        status: Option<u16>,
        flushed: bool,
    }

    impl ResponseWriter for BodyWriter {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.body.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn write_header(&mut self, status: u16) {
            self.status = Some(status);
        }

        fn flush(&mut self) -> Result<()> {
            self.flushed = true;
            Ok(())
        }
    }

    fn access_log(options: AccessLogOptions) -> (SharedBuffer, AccessLog) {
        let buf = SharedBuffer::new();
        let sink = JsonSink::new(Destination::from_writer(buf.clone()), HandlerOptions::default());
        (buf, AccessLog::new(Logger::new(Arc::new(sink)), options))
    }

    fn http_fields(buf: &SharedBuffer) -> serde_json::Map<String, JsonValue> {
        let line: JsonValue = serde_json::from_str(buf.contents().trim_end()).unwrap();
        assert_eq!(line["msg"], "Request");
        line["http"].as_object().unwrap().clone()
    }

    fn request() -> AccessRequest {
        AccessRequest::new("GET", "/status?verbose=1")
            .with_host("example.com")
            .with_remote_addr("10.1.2.3:54321")
            .with_header("User-Agent", "curl/8.0")
            .with_header("Referer", "https://example.com/")
    }

    #[test]
    fn test_record_shape_and_order() {
        let (buf, log) = access_log(AccessLogOptions::default().forwarded_for(true));
        let mut req = request().with_header("X-Forwarded-For", "192.0.2.1");
        let mut writer = BodyWriter::default();

        log.serve(&mut req, &mut writer, |_, w| {
            w.write_header(201);
            w.write(b"hello").unwrap();
        })
        .unwrap();

        let http = http_fields(&buf);
        let keys: Vec<_> = http.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "host",
                "username",
                "timestamp",
                "method",
                "uri",
                "proto",
                "status",
                "size",
                "referer",
                "user-agent",
                "request-time",
                "forwarded_for"
            ]
        );
        assert_eq!(http["host"], "10.1.2.3");
        assert_eq!(http["username"], "-");
        assert_eq!(http["method"], "GET");
        assert_eq!(http["uri"], "/status?verbose=1");
        assert_eq!(http["proto"], "HTTP/1.1");
        assert_eq!(http["status"], 201);
        assert_eq!(http["size"], 5);
        assert_eq!(http["forwarded_for"], "192.0.2.1");
        assert_eq!(writer.body, b"hello");
        assert_eq!(writer.status, Some(201));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let (buf, log) = access_log(AccessLogOptions::default().timing(false).timestamp(false));
        log.serve(&mut request(), &mut BodyWriter::default(), |_, _| {})
            .unwrap();

        let http = http_fields(&buf);
        assert!(!http.contains_key("timestamp"));
        assert!(!http.contains_key("request-time"));
        assert!(!http.contains_key("forwarded_for"));
        assert_eq!(http["status"], 200);
        assert_eq!(http["size"], 0);
    }

    #[test]
    fn test_noop_header_suppresses_and_is_stripped() {
        let (buf, log) = access_log(AccessLogOptions::default());
        let mut req = request().with_header("x-logging-noop", "1");
        let mut seen = None;

        log.serve(&mut req, &mut BodyWriter::default(), |r, _| {
            seen = Some(r.header(HEADER_NOOP).is_some());
        })
        .unwrap();

        assert_eq!(seen, Some(false));
        assert!(req.header(HEADER_NOOP).is_none());
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn test_username_is_escaped() {
        let (buf, log) = access_log(AccessLogOptions::default());
        let mut req = request().with_header(HEADER_USERNAME, "<script>alert('x')</script>");
        log.serve(&mut req, &mut BodyWriter::default(), |_, _| {})
            .unwrap();

        assert_eq!(
            http_fields(&buf)["username"],
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_user_agent_and_uri_sanitized() {
        let (buf, log) = access_log(AccessLogOptions::default());
        let mut req = AccessRequest::new("GET", "/a\r\nb\0")
            .with_remote_addr("[::1]:8080")
            .with_header("User-Agent", "Mozilla/5.0+(X11)\r\nInjected\0");
        log.serve(&mut req, &mut BodyWriter::default(), |_, _| {})
            .unwrap();

        let http = http_fields(&buf);
        assert_eq!(http["user-agent"], "Mozilla/5.0 (X11)Injected\\0");
        assert_eq!(http["uri"], "/ab\\0");
        assert_eq!(http["host"], "::1");
    }

    #[test]
    fn test_connect_over_http2_uses_host() {
        let (buf, log) = access_log(AccessLogOptions::default());
        let mut req = AccessRequest::new("CONNECT", "")
            .with_proto("HTTP/2.0")
            .with_host("upstream:443");
        log.serve(&mut req, &mut BodyWriter::default(), |_, _| {})
            .unwrap();
        assert_eq!(http_fields(&buf)["uri"], "upstream:443");
    }

    #[test]
    fn test_empty_uri_becomes_root() {
        let (buf, log) = access_log(AccessLogOptions::default());
        let mut req = AccessRequest::new("GET", "");
        log.serve(&mut req, &mut BodyWriter::default(), |_, _| {})
            .unwrap();
        assert_eq!(http_fields(&buf)["uri"], "/");
    }

    #[test]
    fn test_level_option() {
        let (buf, log) = access_log(AccessLogOptions::default().level(Level::WARN));
        log.serve(&mut request(), &mut BodyWriter::default(), |_, _| {})
            .unwrap();
        assert!(buf.contents().contains("\"level\":\"WARN\""));
    }

    #[test]
    fn test_recorder_capabilities() {
        let mut inner = BodyWriter::default();
        let mut recorder = ResponseRecorder::new(&mut inner);
        assert!(recorder.flush().is_ok());
        assert!(matches!(
            recorder.push("/style.css"),
            Err(LogError::Unimplemented { capability: "push" })
        ));
        drop(recorder);
        assert!(inner.flushed);
    }

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("10.0.0.1:80"), "10.0.0.1");
        assert_eq!(split_host("[fe80::1]:443"), "fe80::1");
        assert_eq!(split_host("fe80::1"), "fe80::1");
        assert_eq!(split_host("localhost"), "localhost");
        assert_eq!(split_host(""), "");
    }

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_user_agent("a+b\nc\0"), "a bc\\0");
        assert_eq!(sanitize_uri("/x+y\r\n"), "/x+y");
        assert_eq!(escape_html("a&b\"c"), "a&amp;b&#34;c");
    }
}
