/*!
probe.rs

Implements the `probe` subcommand: fetch a JSON document from the source
endpoint, derive one mutation per eligible field, and resubmit each
mutation individually to the target endpoint.

Flow:
  1. Resolve endpoints (CLI > env), parse headers, build the client.
  2. Load the document (source fetch or --body/--body-file override);
     the root must be a JSON object.
  3. Walk the document; every mutable leaf becomes one single-field
     submission, throttled by --rate-limit when set.
  4. Report every attempt (bucket-colored status + response body, or one
     JSON line each) and a final summary.

JSON Attempt Output:
{"status":"ok","field":"a.b","original":true,"mutated":false,
 "payload":{"a":{"b":false}},"http_status":200,"bucket":"accepted",
 "body":"..."}

JSON Summary Output:
{"status":"done","source":"...","target":"...","attempted":7,
 "accepted":2,"any_accepted":true,"elapsed_ms":120}

JSON Error Output:
{"status":"error","error":"message"}
*/

use anyhow::{Context, Result};
use clap::Args;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use url::Url;

use crate::cmd::format::{Marker, StyleOptions, box_header, color, marker, status_role};
use crate::cmd::shared::{self, output_error};
use crate::http::{self, ClientConfig, HttpClient, HttpResponse, StatusBucket};
use crate::log_info;
use crate::mutate::{self, IgnoreSet, Submission, Submit};

/* ---- Argument Struct ---- */

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Source endpoint to fetch the document from (falls back to
    /// MASSPROBE_SOURCE)
    #[arg(long = "fetch-from", value_name = "URL")]
    pub fetch_from: Option<String>,

    /// Target endpoint for the mutated submissions (falls back to
    /// MASSPROBE_TARGET)
    #[arg(short = 't', long = "target", value_name = "URL")]
    pub target: Option<String>,

    /// Custom header for both requests (repeatable). Format: 'Key: Value'
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// Route all traffic through a proxy, e.g. http://127.0.0.1:8080
    #[arg(short = 'p', long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Maximum submissions per second (blocking sleep between dispatches)
    #[arg(long = "rate-limit", value_name = "N")]
    pub rate_limit: Option<f64>,

    /// HTTP method for the source fetch
    #[arg(long = "fetch-method", value_name = "METHOD", default_value = "GET")]
    pub fetch_method: String,

    /// HTTP method for the mutated submissions
    #[arg(long = "probe-method", value_name = "METHOD", default_value = "PUT")]
    pub probe_method: String,

    /// Comma-separated exact field paths to leave untouched
    /// (e.g. 'id,owner.id')
    #[arg(long = "ignore-fields", value_name = "PATHS")]
    pub ignore_fields: Option<String>,

    /// Inline JSON document to probe instead of fetching the source
    #[arg(long, value_name = "JSON", conflicts_with = "body_file")]
    pub body: Option<String>,

    /// JSON or YAML file with the document to probe instead of fetching
    #[arg(long = "body-file", value_name = "PATH")]
    pub body_file: Option<String>,

    /// Output JSON lines instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/* ---- Public Entry Point ---- */

pub fn execute_probe(mut args: ProbeArgs) -> Result<()> {
    // CLI beats the environment on both endpoints.
    if args.fetch_from.is_none()
        && let Ok(env_s) = std::env::var("MASSPROBE_SOURCE")
        && !env_s.trim().is_empty()
    {
        args.fetch_from = Some(env_s);
    }
    if args.target.is_none()
        && let Ok(env_t) = std::env::var("MASSPROBE_TARGET")
        && !env_t.trim().is_empty()
    {
        args.target = Some(env_t);
    }

    let Some(target_raw) = args.target.as_deref() else {
        return output_error(
            args.json,
            "no target specified (use --target or MASSPROBE_TARGET)",
        );
    };
    let target = http::parse_endpoint(target_raw)
        .with_context(|| format!("failed to parse target: '{target_raw}'"))?;
    let probe_method = http::parse_method(&args.probe_method)?;

    if let Some(rate) = args.rate_limit
        && !(rate > 0.0 && rate.is_finite())
    {
        return output_error(args.json, "--rate-limit must be a positive number");
    }

    let headers = shared::parse_headers(&args.headers)?;
    let client = HttpClient::new(&ClientConfig {
        proxy: args.proxy.clone(),
        insecure: args.insecure,
        timeout_secs: args.timeout,
    })?;

    let ignore = args
        .ignore_fields
        .as_deref()
        .map(IgnoreSet::from_list)
        .unwrap_or_default();

    let (document, source_label) = shared::load_document(
        &client,
        args.fetch_from.as_deref(),
        &args.fetch_method,
        &headers,
        args.body.as_deref(),
        args.body_file.as_deref(),
        args.json,
    )?;

    if !args.json {
        let style = StyleOptions::detect();
        println!(
            "{}",
            box_header(
                format!("massprobe v{}", env!("CARGO_PKG_VERSION")),
                Some(format!("source={source_label} -> target={target}")),
                &style,
            )
        );
        if !ignore.is_empty() {
            log_info!("{} field path(s) in the ignore set", ignore.len());
        }
    }

    let started = Instant::now();
    let mut submitter = HttpSubmitter {
        client: &client,
        method: probe_method,
        target: &target,
        headers: &headers,
        pause: throttle_pause(args.rate_limit),
        json: args.json,
        style: StyleOptions::detect(),
        attempted: 0,
        accepted: 0,
    };
    let any_accepted = mutate::walk(&document, &ignore, &mut submitter)?;
    let elapsed_ms = started.elapsed().as_millis();

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "done",
                "source": source_label,
                "target": target.to_string(),
                "attempted": submitter.attempted,
                "accepted": submitter.accepted,
                "any_accepted": any_accepted,
                "elapsed_ms": elapsed_ms,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    if submitter.attempted == 0 {
        println!(
            "{} no mutable fields found in the document",
            marker(Marker::Info, &style)
        );
    } else if any_accepted {
        println!(
            "{} {}/{} modification attempts accepted by the target ({} ms)",
            marker(Marker::Plus, &style),
            submitter.accepted,
            submitter.attempted,
            elapsed_ms
        );
    } else {
        println!(
            "{} none of {} modification attempts were accepted ({} ms)",
            marker(Marker::Minus, &style),
            submitter.attempted,
            elapsed_ms
        );
    }

    Ok(())
}

/// `1/rate` seconds between dispatches, when a rate limit is configured.
fn throttle_pause(rate_limit: Option<f64>) -> Option<Duration> {
    rate_limit.map(|rate| Duration::from_secs_f64(1.0 / rate))
}

/* ---- HTTP Submitter ---- */

/// Sends each submission to the target and reports the outcome. One
/// request per mutated leaf, strictly sequential; the optional pause is a
/// plain blocking sleep after each dispatch.
struct HttpSubmitter<'a> {
    client: &'a HttpClient,
    method: Method,
    target: &'a Url,
    headers: &'a HeaderMap,
    pause: Option<Duration>,
    json: bool,
    style: StyleOptions,
    attempted: u64,
    accepted: u64,
}

impl Submit for HttpSubmitter<'_> {
    fn submit(&mut self, submission: &Submission) -> Result<bool> {
        self.attempted += 1;
        let response =
            self.client
                .send(&self.method, self.target, self.headers, Some(&submission.payload))?;
        if let Some(pause) = self.pause {
            std::thread::sleep(pause);
        }
        let bucket = StatusBucket::classify(response.status);
        if bucket.is_accepted() {
            self.accepted += 1;
        }
        self.report(submission, &response, bucket);
        Ok(bucket.is_accepted())
    }
}

impl HttpSubmitter<'_> {
    fn report(&self, submission: &Submission, response: &HttpResponse, bucket: StatusBucket) {
        if self.json {
            println!(
                "{}",
                serde_json::json!({
                    "status": "ok",
                    "field": submission.path,
                    "original": submission.original,
                    "mutated": submission.mutated,
                    "payload": submission.payload,
                    "http_status": response.status,
                    "bucket": bucket.as_str(),
                    "body": response.body,
                })
            );
            return;
        }
        println!(
            "{} attempting to modify '{}' ({} -> {})",
            marker(Marker::Info, &self.style),
            submission.path,
            submission.original,
            submission.mutated
        );
        println!(
            "{} status: {}",
            marker(Marker::Plus, &self.style),
            color(status_role(bucket), response.status.to_string(), &self.style)
        );
        println!(
            "{} body: {}\n",
            marker(Marker::Plus, &self.style),
            response.body
        );
    }
}

/* ---- Tests ---- */
