//! `ledgerforge status`: query a running server.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::{note_error, note_success, render_table, Column};

pub async fn run(port: u16) -> Result<()> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let url = format!("http://localhost:{port}/api/health");

    let resp = match client.get(&url).send().await {
        Ok(resp) => resp,
        Err(_) => {
            note_error(&format!("LedgerForge is not running on port {port}"));
            return Ok(());
        }
    };

    let body: Value = resp.json().await?;
    note_success(&format!("LedgerForge is up on port {port}"));
    print!("{}", render_table(&[Column::left("Field"), Column::left("Value")], &health_rows(&body)));
    Ok(())
}

fn health_rows(body: &Value) -> Vec<Vec<String>> {
    let Some(fields) = body.as_object() else {
        return Vec::new();
    };
    fields
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vec![key.clone(), shown]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn health_rows_unquote_strings() {
        let rows = health_rows(&json!({ "status": "ok", "toolCount": 18 }));
        assert!(rows.contains(&vec!["status".to_string(), "ok".to_string()]));
        assert!(rows.contains(&vec!["toolCount".to_string(), "18".to_string()]));
    }

    #[test]
    fn non_object_health_has_no_rows() {
        assert!(health_rows(&json!("down")).is_empty());
    }
}
