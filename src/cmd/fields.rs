/*!
fields.rs

Implements the `fields` subcommand: load the source document and show what
`probe` would do (every candidate field path, its current type and value,
and the mutation that would be submitted) without sending anything to a
target.

Behavior:
  - Same source side as `probe` (fetch or --body/--body-file override,
    MASSPROBE_SOURCE fallback).
  - The ignore set is applied, so the listing reflects the real plan.
  - Human output is a table; --json emits a single object.

JSON Output Shape:
{
  "status": "ok",
  "source": "http://...",
  "count": 3,
  "fields": [
    {"path":"a.b","type":"bool","current":true,"mutated":false}
  ]
}
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Marker, Role, StyleOptions, box_header, color, marker, table, truncate_ellipsis};
use crate::cmd::shared;
use crate::http::{ClientConfig, HttpClient};
use crate::mutate::{self, IgnoreSet, RecordingSubmitter, leaf_kind};

/* ---- Argument Struct ---- */

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Source endpoint to fetch the document from (falls back to
    /// MASSPROBE_SOURCE)
    #[arg(long = "fetch-from", value_name = "URL")]
    pub fetch_from: Option<String>,

    /// Custom header for the fetch (repeatable). Format: 'Key: Value'
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,

    /// Route the fetch through a proxy, e.g. http://127.0.0.1:8080
    #[arg(short = 'p', long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// HTTP method for the source fetch
    #[arg(long = "fetch-method", value_name = "METHOD", default_value = "GET")]
    pub fetch_method: String,

    /// Comma-separated exact field paths to leave untouched
    #[arg(long = "ignore-fields", value_name = "PATHS")]
    pub ignore_fields: Option<String>,

    /// Inline JSON document to inspect instead of fetching the source
    #[arg(long, value_name = "JSON", conflicts_with = "body_file")]
    pub body: Option<String>,

    /// JSON or YAML file with the document to inspect instead of fetching
    #[arg(long = "body-file", value_name = "PATH")]
    pub body_file: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/* ---- Public Entry Point ---- */

pub fn execute_fields(mut args: FieldsArgs) -> Result<()> {
    if args.fetch_from.is_none()
        && let Ok(env_s) = std::env::var("MASSPROBE_SOURCE")
        && !env_s.trim().is_empty()
    {
        args.fetch_from = Some(env_s);
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

    let mut recorder = RecordingSubmitter::default();
    mutate::walk(&document, &ignore, &mut recorder)?;
    let count = recorder.submissions.len();

    if args.json {
        let fields: Vec<serde_json::Value> = recorder
            .submissions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "path": s.path,
                    "type": leaf_kind(&s.original),
                    "current": s.original,
                    "mutated": s.mutated,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "source": source_label,
                "count": count,
                "fields": fields,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("Mutable Fields ({count})"),
            Some(format!("source={source_label}")),
            &style,
        )
    );

    if count == 0 {
        println!("{} (none)", marker(Marker::Info, &style));
        return Ok(());
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(count);
    for (idx, s) in recorder.submissions.iter().enumerate() {
        rows.push(vec![
            (idx + 1).to_string(),
            s.path.clone(),
            leaf_kind(&s.original).to_string(),
            truncate_ellipsis(&s.original.to_string(), 40),
            truncate_ellipsis(&s.mutated.to_string(), 40),
        ]);
    }
    println!("{}", table(&["#", "PATH", "TYPE", "CURRENT", "MUTATED"], &rows, &style));

    if !ignore.is_empty() {
        println!(
            "\n{}",
            color(
                Role::Dim,
                format!(
                    "{} ignore entries applied; run without --ignore-fields to see everything",
                    ignore.len()
                ),
                &style
            )
        );
    }
    println!(
        "{}",
        color(
            Role::Dim,
            "Use `massprobe probe -t <URL>` to submit these mutations",
            &style
        )
    );

    Ok(())
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        Fields(FieldsArgs),
    }

    #[test]
    fn clap_parses_fields_flags() {
        let cli = TestCli::try_parse_from([
            "t",
            "fields",
            "--body",
            r#"{"a": 1}"#,
            "--ignore-fields",
            "a",
            "--json",
        ])
        .unwrap();
        let TestSub::Fields(args) = cli.cmd;
        assert_eq!(args.body.as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(args.ignore_fields.as_deref(), Some("a"));
        assert!(args.json);
        assert!(args.fetch_from.is_none());
    }

    #[test]
    fn fields_has_no_target_flag() {
        assert!(TestCli::try_parse_from(["t", "fields", "-t", "http://x"]).is_err());
    }
}
