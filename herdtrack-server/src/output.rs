//! JSON line output
//!
//! Every position update, transition and alert is written as one JSON object
//! per line, tagged with a `type` field, so the output can be piped into a
//! map front end or `jq`.

use std::io::Write;

use chrono::{DateTime, Utc};
use herdtrack_core::geofence::DEFAULT_BOUNDARY_ID;
use herdtrack_core::session::{ObjectUpdate, SessionStatus, SessionUpdate};
use herdtrack_core::transitions::{TransitionEvent, TransitionKind};
use serde::Serialize;

/// Human readable alert derived from a transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub object_id: String,
    pub kind: TransitionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_id: Option<String>,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutputLine<'a> {
    Position(&'a ObjectUpdate),
    Transition(&'a TransitionEvent),
    Alert(Alert),
    Status(&'a SessionStatus),
}

/// "Elephant", "Object", ...
fn object_label(object_type: Option<&str>) -> String {
    let mut chars = object_type.unwrap_or("object").chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Object".to_string(),
    }
}

/// Alert text for transitions worth raising, `None` for the rest
pub fn alert_message(event: &TransitionEvent, object_type: Option<&str>) -> Option<String> {
    let label = object_label(object_type);
    match event.kind {
        TransitionKind::Entered => {
            let area = match event.circle_id.as_deref() {
                None | Some(DEFAULT_BOUNDARY_ID) => "restricted area".to_string(),
                Some(id) => format!("zone {}", id),
            };
            Some(format!("ALERT: {} {} entered {}!", label, event.object_id, area))
        }
        TransitionKind::ViolatedCombined => Some(format!(
            "ALERT: {} {} left all monitored zones!",
            label, event.object_id
        )),
        TransitionKind::Exited | TransitionKind::ReturnedCombined => None,
    }
}

/// Writes session output as JSON lines
pub struct Printer<W: Write> {
    out: W,
    alerts: bool,
    lines: u64,
    alerts_raised: u64,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Printer {
            out,
            alerts: true,
            lines: 0,
            alerts_raised: 0,
        }
    }

    /// Print transitions without the derived alert lines
    pub fn without_alerts(mut self) -> Self {
        self.alerts = false;
        self
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &OutputLine<'_>) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, line)?;
        self.out.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_update(&mut self, update: &SessionUpdate) -> anyhow::Result<()> {
        for position in &update.positions {
            self.write_line(&OutputLine::Position(position))?;
        }

        for event in &update.events {
            self.write_line(&OutputLine::Transition(event))?;
            if !self.alerts {
                continue;
            }

            // Positions are sorted by object id
            let object_type = update
                .positions
                .binary_search_by(|p| p.object_id.as_str().cmp(event.object_id.as_str()))
                .ok()
                .and_then(|i| update.positions[i].object_type.as_deref());

            if let Some(message) = alert_message(event, object_type) {
                log::warn!("{}", message);
                self.alerts_raised += 1;
                self.write_line(&OutputLine::Alert(Alert {
                    object_id: event.object_id.clone(),
                    kind: event.kind,
                    circle_id: event.circle_id.clone(),
                    message,
                    raised_at: Utc::now(),
                }))?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn write_status(&mut self, status: &SessionStatus) -> anyhow::Result<()> {
        self.write_line(&OutputLine::Status(status))?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdtrack_core::config::EngineSettings;
    use herdtrack_core::frames::{Frame, LiveAssembler};
    use herdtrack_core::projection::{GeoPoint, Scale};
    use herdtrack_core::sample::Sample;
    use herdtrack_core::session::TrackingSession;

    fn event(kind: TransitionKind, circle_id: Option<&str>) -> TransitionEvent {
        TransitionEvent {
            object_id: "3".to_string(),
            kind,
            circle_id: circle_id.map(str::to_string),
            position: GeoPoint::new(0.0, 0.0),
            timestamp: None,
            frame_index: None,
        }
    }

    #[test]
    fn test_alert_messages() {
        assert_eq!(
            alert_message(&event(TransitionKind::Entered, Some("default")), Some("elephant")),
            Some("ALERT: Elephant 3 entered restricted area!".to_string())
        );
        assert_eq!(
            alert_message(&event(TransitionKind::Entered, Some("camp")), None),
            Some("ALERT: Object 3 entered zone camp!".to_string())
        );
        assert_eq!(
            alert_message(&event(TransitionKind::ViolatedCombined, None), Some("rhino")),
            Some("ALERT: Rhino 3 left all monitored zones!".to_string())
        );
        assert!(alert_message(&event(TransitionKind::Exited, Some("camp")), None).is_none());
        assert!(alert_message(&event(TransitionKind::ReturnedCombined, None), None).is_none());
    }

    #[test]
    fn test_update_lines() {
        let mut session = TrackingSession::new(EngineSettings::default()).unwrap();
        let mut live = LiveAssembler::new();
        let mut sample = Sample::new("3", 100.0, 0.0);
        sample.object_type = Some("elephant".to_string());
        live.push(
            Frame::new(1, vec![sample]).with_reference(GeoPoint::new(-1.2921, 34.7617), Scale::new(1.0)),
        )
        .unwrap();
        let update = session.ingest(&mut live);

        let mut printer = Printer::new(Vec::new());
        printer.write_update(&update).unwrap();
        printer.write_status(&session.status()).unwrap();
        assert_eq!(printer.alerts_raised(), 1);

        let text = String::from_utf8(printer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        let types: Vec<_> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["position", "transition", "alert", "transition", "status"]
        );
        assert_eq!(lines[0]["objectId"], "3");
        assert_eq!(lines[1]["kind"], "entered");
        assert_eq!(lines[2]["message"], "ALERT: Elephant 3 entered restricted area!");
        assert_eq!(lines[3]["kind"], "returnedCombined");
        assert_eq!(lines[4]["objectsInside"], 1);
    }

    #[test]
    fn test_alerts_can_be_disabled() {
        let update = SessionUpdate {
            events: vec![event(TransitionKind::Entered, Some("default"))],
            ..SessionUpdate::default()
        };
        let mut printer = Printer::new(Vec::new()).without_alerts();
        printer.write_update(&update).unwrap();
        assert_eq!(printer.lines(), 1);
        assert_eq!(printer.alerts_raised(), 0);
    }
}
