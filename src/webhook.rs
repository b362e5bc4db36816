//! Temporary webhook listener for discovering a LINE group id.
//!
//! Point the LINE channel's webhook URL at this listener (through a tunnel),
//! then send any message in the target group. The group id shows up in the
//! log; copy it into `LINE_GROUP_ID`. Every request is answered with
//! `{"status":"ok"}` so LINE's verification succeeds.

use rocket::serde::json::Json;
use rocket::{Build, Rocket, post, routes};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use tracing::{info, instrument, warn};

/// Where an incoming event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Group { group_id: String },
    User { user_id: Option<String> },
    Other { kind: Option<String>, raw: String },
}

#[derive(Debug, Serialize)]
struct Ack {
    status: &'static str,
}

/// Classify the sources of all events in a webhook body.
pub fn event_sources(body: &Value) -> Vec<EventSource> {
    let Some(events) = body.get("events").and_then(Value::as_array) else {
        return Vec::new();
    };

    events
        .iter()
        .map(|event| {
            let source = event.get("source").cloned().unwrap_or(Value::Null);
            let kind = source.get("type").and_then(Value::as_str);
            let field = |name: &str| source.get(name).and_then(Value::as_str).map(str::to_string);
            match (kind, field("groupId")) {
                (Some("group"), Some(group_id)) => EventSource::Group { group_id },
                (Some("user"), _) => EventSource::User {
                    user_id: field("userId"),
                },
                _ => EventSource::Other {
                    kind: kind.map(str::to_string),
                    raw: source.to_string(),
                },
            }
        })
        .collect()
}

fn report(source: &EventSource) {
    match source {
        EventSource::Group { group_id } => info!(
            %group_id,
            "Found group id; set LINE_GROUP_ID to this value"
        ),
        EventSource::User { user_id } => warn!(
            user_id = user_id.as_deref().unwrap_or("unknown"),
            "Received a direct message; send the message inside the group instead"
        ),
        EventSource::Other { kind, raw } => info!(
            kind = kind.as_deref().unwrap_or("unknown"),
            source = %raw,
            "Received event"
        ),
    }
}

fn handle(body: &str) -> Json<Ack> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => event_sources(&value).iter().for_each(report),
        Err(e) => warn!(error = %e, "Webhook body is not JSON"),
    }
    Json(Ack { status: "ok" })
}

#[post("/", data = "<body>")]
fn root(body: String) -> Json<Ack> {
    handle(&body)
}

#[post("/callback", data = "<body>")]
fn callback(body: String) -> Json<Ack> {
    handle(&body)
}

/// Build the listener bound to every interface on `port`.
pub fn build(port: u16) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", port))
        .merge(("address", "0.0.0.0"))
        .merge(("log_level", "critical"));
    rocket::custom(figment).mount("/", routes![root, callback])
}

/// Serve until interrupted.
#[instrument(level = "info")]
pub async fn serve(port: u16) -> Result<(), Box<dyn Error>> {
    info!(port, "Webhook listener starting; send any message in the LINE group (Ctrl+C to stop)");
    build(port)
        .launch()
        .await
        .map_err(|e| format!("webhook listener failed: {}", e.kind()))?;
    info!("Webhook listener stopped");
    Ok(())
}
