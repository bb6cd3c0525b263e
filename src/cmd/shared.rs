/*!
shared.rs - helpers shared by the probe and fields subcommands.

Focus:
  - parse_headers: repeatable "Key: Value" flags -> HeaderMap
  - load_document: source fetch (status / content-type / decode gates) or
    operator-supplied body override
  - load_body_file / parse_inline_body: JSON or YAML document overrides

The source gates print their diagnostic and then bail, so callers never
see a partially validated document.
*/

use anyhow::{Context, Result, bail};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

use crate::cmd::format::{Marker, StyleOptions, color, marker, status_role};
use crate::http::{self, HttpClient, HttpResponse, StatusBucket};
use crate::mutate::leaf_kind;

/// Top-level JSON object under probe.
pub type Document = Map<String, Value>;

/* ---- Header Parsing ---- */

/// Parse repeatable `-H "Key: Value"` flags. Split on the first colon,
/// trim both sides; repeated names append rather than overwrite.
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let Some((key, value)) = line.split_once(':') else {
            bail!("invalid header (expected 'Key: Value'): {line}");
        };
        let name: HeaderName = key
            .trim()
            .parse()
            .with_context(|| format!("invalid header name: '{}'", key.trim()))?;
        let value: HeaderValue = value
            .trim()
            .parse()
            .with_context(|| format!("invalid header value in: '{line}'"))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/* ---- Document Loading ---- */

/// Resolve the document to probe: an inline `--body`, a `--body-file`, or
/// a fetch from the source endpoint. Returns the document plus a label
/// describing where it came from (for banners and JSON output).
pub fn load_document(
    client: &HttpClient,
    fetch_from: Option<&str>,
    fetch_method: &str,
    headers: &HeaderMap,
    body: Option<&str>,
    body_file: Option<&str>,
    json_mode: bool,
) -> Result<(Document, String)> {
    if let Some(inline) = body {
        return Ok((parse_inline_body(inline)?, "inline body".to_string()));
    }
    if let Some(path) = body_file {
        return Ok((load_body_file(path)?, format!("file:{path}")));
    }
    let Some(source) = fetch_from else {
        bail!("no source specified (use --fetch-from, MASSPROBE_SOURCE, or a body override)");
    };
    let url = http::parse_endpoint(source)?;
    let method = http::parse_method(fetch_method)?;
    let doc = fetch_document(client, &method, &url, headers, json_mode)?;
    Ok((doc, url.to_string()))
}

/// Fetch the source document, enforcing the 200 + JSON + object gates.
pub fn fetch_document(
    client: &HttpClient,
    method: &reqwest::Method,
    url: &Url,
    headers: &HeaderMap,
    json_mode: bool,
) -> Result<Document> {
    let response = client.send(method, url, headers, None)?;

    if response.status != 200 || !response.is_json() {
        report_bad_source(&response, url, json_mode);
        bail!("source endpoint did not return a JSON document");
    }

    let value: Value = match serde_json::from_str(&response.body) {
        Ok(v) => v,
        Err(e) => {
            report_source_error(&format!("failed to decode JSON from '{url}': {e}"), json_mode);
            bail!("failed to decode JSON response from '{url}'");
        }
    };

    match document_from_value(value) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            report_source_error(&e.to_string(), json_mode);
            Err(e)
        }
    }
}

/// Require a JSON object at the document root.
pub fn document_from_value(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!(
            "the response JSON is not an object (got {})",
            leaf_kind(&other)
        ),
    }
}

/// Parse an inline `--body` JSON document.
pub fn parse_inline_body(raw: &str) -> Result<Document> {
    let value: Value =
        serde_json::from_str(raw).context("failed to parse --body as JSON")?;
    document_from_value(value)
}

/// Load a `--body-file` document. YAML by extension, JSON otherwise.
pub fn load_body_file(path: &str) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read body file: {path}"))?;
    let lower = path.to_ascii_lowercase();
    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML body file")?;
        serde_json::to_value(yaml).context("failed to convert YAML body file to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON body file")?
    };
    document_from_value(value)
}

/* ---- Source Diagnostics ---- */

fn report_bad_source(response: &HttpResponse, url: &Url, json_mode: bool) {
    if json_mode {
        let err = serde_json::json!({
            "status": "error",
            "error": format!("failed to get a valid JSON response from '{url}'"),
            "http_status": response.status,
            "content_type": response.content_type,
            "body": response.body,
        });
        println!("{err}");
        return;
    }
    let style = StyleOptions::detect();
    let bucket = StatusBucket::classify(response.status);
    println!(
        "{} failed to get a valid JSON response from '{url}'",
        marker(Marker::Minus, &style)
    );
    println!(
        "    status: {}",
        color(status_role(bucket), response.status.to_string(), &style)
    );
    println!("    body: {}", response.body);
}

fn report_source_error(msg: &str, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::json!({"status": "error", "error": msg}));
    } else {
        let style = StyleOptions::detect();
        println!("{} {}", marker(Marker::Minus, &style), msg);
    }
}

/// Print an operator error (JSON object or `[!]` line) and bail with the
/// same message.
pub fn output_error(json_mode: bool, msg: &str) -> Result<()> {
    if json_mode {
        println!("{}", serde_json::json!({"status": "error", "error": msg}));
    } else {
        let style = StyleOptions::detect();
        println!("{} {}", marker(Marker::Fatal, &style), msg);
    }
    anyhow::bail!(msg.to_string())
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_split_on_first_colon() {
        let headers =
            parse_headers(&["Authorization: Bearer a:b:c".to_string()]).unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer a:b:c");
    }

    #[test]
    fn headers_trim_both_sides() {
        let headers = parse_headers(&["  X-Probe :  yes  ".to_string()]).unwrap();
        assert_eq!(headers.get("x-probe").unwrap(), "yes");
    }

    #[test]
    fn repeated_header_names_append() {
        let headers = parse_headers(&[
            "Cookie: a=1".to_string(),
            "Cookie: b=2".to_string(),
        ])
        .unwrap();
        assert_eq!(headers.get_all("cookie").iter().count(), 2);
    }

    #[test]
    fn header_without_colon_is_rejected() {
        let err = parse_headers(&["NoColonHere".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected 'Key: Value'"));
    }

    #[test]
    fn inline_body_must_be_an_object() {
        assert!(parse_inline_body(r#"{"a": 1}"#).is_ok());
        let err = parse_inline_body("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("not an object"));
        assert!(parse_inline_body("not json").is_err());
    }

    #[test]
    fn document_root_gate() {
        assert!(document_from_value(json!({"a": 1})).is_ok());
        assert!(document_from_value(json!(["a"])).is_err());
        assert!(document_from_value(json!("a")).is_err());
        assert!(document_from_value(json!(1)).is_err());
    }

    #[test]
    fn body_file_json() {
        let path = std::env::temp_dir().join("massprobe_body_test.json");
        std::fs::write(&path, r#"{"role": "user", "admin": false}"#).unwrap();
        let doc = load_body_file(path.to_str().unwrap()).unwrap();
        assert_eq!(doc.get("admin"), Some(&json!(false)));
    }

    #[test]
    fn body_file_yaml() {
        let path = std::env::temp_dir().join("massprobe_body_test.yaml");
        std::fs::write(&path, "role: user\nadmin: false\n").unwrap();
        let doc = load_body_file(path.to_str().unwrap()).unwrap();
        assert_eq!(doc.get("role"), Some(&json!("user")));
        assert_eq!(doc.get("admin"), Some(&json!(false)));
    }

    #[test]
    fn body_file_rejects_non_object_roots() {
        let path = std::env::temp_dir().join("massprobe_body_list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_body_file(path.to_str().unwrap()).is_err());
    }
}
