//! `mockwire plan`: show how a fixture would be delivered, without playing it.

use std::path::Path;

use anyhow::Result;
use mockwire_delivery::ResponseSpec;
use serde_json::json;

use crate::fixture::Fixture;

pub fn plan(path: &Path, format: &str) -> Result<()> {
    let spec = Fixture::from_file(path)?.to_spec()?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan_json(&spec))?),
        _ => println!("{}", plan_text(&spec)),
    }
    Ok(())
}

pub fn plan_text(spec: &ResponseSpec) -> String {
    match (spec.transport_error(), spec.chunk_plan()) {
        (Some(error), _) => format!("failure: {error}"),
        (None, Some(plan)) => {
            let lengths: Vec<String> = plan.lengths().iter().map(usize::to_string).collect();
            format!(
                "status {}, {} headers, {} chunk(s) [{}], {:?} between chunks",
                spec.status_code().unwrap_or_default(),
                spec.headers().map_or(0, |h| h.len()),
                plan.len(),
                lengths.join(", "),
                spec.inter_chunk_delay(),
            )
        }
        (None, None) => String::new(),
    }
}

pub fn plan_json(spec: &ResponseSpec) -> serde_json::Value {
    match (spec.transport_error(), spec.chunk_plan()) {
        (Some(error), _) => json!({ "error": error.message(), "code": error.code() }),
        (None, plan) => json!({
            "status": spec.status_code(),
            "headers": spec.headers().map_or(0, |h| h.len()),
            "chunks": plan.map(|p| p.lengths()).unwrap_or_default(),
            "delay_ms": u64::try_from(spec.inter_chunk_delay().as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
