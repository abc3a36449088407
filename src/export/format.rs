//! Session log serialization: CSV and the JSON `{data: [...]}` envelope.

use std::collections::HashSet;

use crate::engine::models::{ExportFormat, LogEvent};
use crate::export::backend::UploadFile;

/// Flatten one event into ordered `(column, value)` pairs.
fn flatten(event: &LogEvent) -> Vec<(String, String)> {
    let mut fields = vec![
        ("PlayerID".to_string(), event.player_id.clone()),
        ("Game".to_string(), event.game.clone()),
        ("Action".to_string(), event.action.as_str().to_string()),
        ("Coins".to_string(), event.coins.to_string()),
        ("Score".to_string(), event.score.to_string()),
        ("Timestamp".to_string(), event.timestamp_ms.to_string()),
    ];
    for (key, value) in &event.details {
        fields.push((key.clone(), render_value(value)));
    }
    fields
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("|"),
        other => other.to_string(),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render the log as CSV.
///
/// The header is the union of every event's columns in first-seen order;
/// every cell is quoted, and array values are joined with `|`.
pub fn events_to_csv(events: &[LogEvent]) -> String {
    let rows: Vec<Vec<(String, String)>> = events.iter().map(flatten).collect();

    let mut header: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for row in &rows {
        for (key, _) in row {
            if seen.insert(key.clone()) {
                header.push(key.clone());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));
    for row in &rows {
        let cells: Vec<String> = header
            .iter()
            .map(|col| {
                let value = row
                    .iter()
                    .find(|(k, _)| k == col)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("");
                quote(value)
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

pub fn events_to_json(events: &[LogEvent]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "data": events })).unwrap_or_default()
}

pub fn serialize_events(events: &[LogEvent], format: ExportFormat) -> Vec<u8> {
    match format {
        ExportFormat::Csv => events_to_csv(events).into_bytes(),
        ExportFormat::Json => events_to_json(events),
    }
}

/// `BuyWord_{player}_{start}.{ext}` with the player id reduced to a safe
/// file-name alphabet.
pub fn export_file_name(player_id: &str, start_ms: u64, format: ExportFormat) -> String {
    let player: String = player_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let player = if player.is_empty() { "anonymous".to_string() } else { player };
    format!("BuyWord_{}_{}.{}", player, start_ms, format.extension())
}

/// Package the log for upload. `None` when there is nothing to export.
pub fn prepare_upload(
    events: &[LogEvent],
    player_id: &str,
    start_ms: u64,
    format: ExportFormat,
) -> Option<UploadFile> {
    if events.is_empty() {
        return None;
    }
    Some(UploadFile {
        name: export_file_name(player_id, start_ms, format),
        mime_type: format.mime_type().to_string(),
        bytes: serialize_events(events, format),
    })
}
