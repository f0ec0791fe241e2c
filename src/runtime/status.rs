use crate::model::{Container, ContainerState};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// The subset of a `compose ps --format json` record we care about.
#[derive(Debug, Deserialize)]
struct PsRecord {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Service", default)]
    service: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
}

impl PsRecord {
    fn into_container(self) -> Option<Container> {
        let (id, name) = match (self.id, self.name) {
            (Some(id), Some(name)) => (id, name),
            (Some(id), None) => (id.clone(), id),
            (None, Some(name)) => (name.clone(), name),
            (None, None) => return None,
        };
        Some(Container {
            id,
            name,
            state: ContainerState::from_runtime(&self.state),
            service: self.service.filter(|s| !s.is_empty()),
            status_text: self.status.filter(|s| !s.is_empty()),
        })
    }
}

fn record_from_value(value: Value) -> Option<Container> {
    serde_json::from_value::<PsRecord>(value)
        .ok()
        .and_then(PsRecord::into_container)
}

/// Parse `compose ps --format json` output into containers.
///
/// Expects one JSON object per line. Lines that are not valid JSON, or objects without
/// a `State` and an `ID`/`Name`, are skipped. Older compose releases print a single
/// JSON array instead; its elements are accepted too.
pub fn parse_ps_output(stdout: &str) -> Vec<Container> {
    let mut containers = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Array(items)) => {
                containers.extend(items.into_iter().filter_map(record_from_value));
            }
            Ok(value @ Value::Object(_)) => {
                if let Some(c) = record_from_value(value) {
                    containers.push(c);
                } else {
                    debug!(line, "skipping ps record without id/name/state");
                }
            }
            Ok(_) | Err(_) => {
                debug!(line, "skipping unparseable ps line");
            }
        }
    }

    containers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(parse_ps_output("").is_empty());
        assert!(parse_ps_output("  \n\t\n").is_empty());
    }

    #[test]
    fn test_json_lines_with_garbage_line() {
        let out = concat!(
            r#"{"ID":"abc123","Name":"web-app-1","Service":"app","State":"running","Status":"Up 2 hours"}"#,
            "\n",
            "WARN[0000] the attribute `version` is obsolete\n",
            r#"{"ID":"def456","Name":"web-db-1","Service":"db","State":"exited","Status":"Exited (0) 3 minutes ago"}"#,
            "\n",
            r#"{"ID":"ghi789","Name":"web-cache-1","State":"#,
            "\n",
        );
        let containers = parse_ps_output(out);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "abc123");
        assert_eq!(containers[0].name, "web-app-1");
        assert_eq!(containers[0].state, ContainerState::Running);
        assert_eq!(containers[0].service.as_deref(), Some("app"));
        assert_eq!(containers[0].status_text.as_deref(), Some("Up 2 hours"));
        assert_eq!(containers[1].state, ContainerState::Exited);
    }

    #[test]
    fn test_array_format() {
        let out = r#"[{"ID":"a","Name":"x-1","State":"paused"},{"Name":"x-2","State":"restarting"}]"#;
        let containers = parse_ps_output(out);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].state, ContainerState::Paused);
        assert_eq!(containers[1].id, "x-2");
        assert_eq!(containers[1].state, ContainerState::Restarting);
    }

    #[test]
    fn test_unrecognised_state_and_missing_fields() {
        let out = concat!(
            r#"{"ID":"a","Name":"x-1","State":"created"}"#,
            "\n",
            r#"{"ID":"b","Name":"x-2"}"#,
            "\n",
            r#"{"Service":"orphan","State":"running"}"#,
            "\n",
            "42\n",
        );
        let containers = parse_ps_output(out);
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].state, ContainerState::Unknown);
    }
}
