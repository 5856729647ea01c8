//! Wire-ready event bodies.
//!
//! [`build`] is a pure function of the draft: the same draft always produces
//! the same payload, byte for byte once serialized.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::EventDraft;

/// Time zone attached to every payload timestamp.
pub const PAYLOAD_TIME_ZONE: &str = "UTC";

/// A timestamp as the calendar API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    /// Renders a UTC instant as RFC 3339 with second precision.
    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            time_zone: PAYLOAD_TIME_ZONE.to_string(),
        }
    }
}

/// Body of an event insert request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
}

/// Builds the insert body for a validated draft.
pub fn build(draft: &EventDraft) -> EventPayload {
    let recurrence = draft
        .recurrence
        .as_ref()
        .and_then(|recurrence| recurrence.to_rule())
        .map(|rule| vec![rule]);

    EventPayload {
        summary: draft.title.clone(),
        start: EventDateTime::utc(draft.start),
        end: EventDateTime::utc(draft.end()),
        recurrence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{Frequency, RecurrenceSpec};
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn standup(recurrence: Option<RecurrenceSpec>) -> EventDraft {
        EventDraft {
            title: "Standup".to_string(),
            start: utc(2025, 1, 2, 9, 0),
            duration: Duration::minutes(15),
            recurrence,
        }
    }

    #[test]
    fn weekday_standup_payload() {
        let draft = standup(Some(RecurrenceSpec::new(
            Frequency::WeeklyWeekday,
            utc(2025, 3, 1, 0, 0),
        )));

        insta::assert_json_snapshot!(build(&draft), @r#"
        {
          "summary": "Standup",
          "start": {
            "dateTime": "2025-01-02T09:00:00Z",
            "timeZone": "UTC"
          },
          "end": {
            "dateTime": "2025-01-02T09:15:00Z",
            "timeZone": "UTC"
          },
          "recurrence": [
            "RRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;UNTIL=20250301T000000Z"
          ]
        }
        "#);
    }

    #[test]
    fn one_off_event_has_no_recurrence_key() {
        let payload = build(&standup(None));
        assert!(payload.recurrence.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("recurrence").is_none());
        assert_eq!(json["end"]["dateTime"], "2025-01-02T09:15:00Z");
    }

    #[test]
    fn none_frequency_has_no_recurrence_key() {
        let draft = standup(Some(RecurrenceSpec::new(
            Frequency::None,
            utc(2025, 3, 1, 0, 0),
        )));
        let json = serde_json::to_string(&build(&draft)).unwrap();
        assert!(!json.contains("recurrence"));
    }

    #[test]
    fn every_repeating_frequency_emits_one_rule() {
        for frequency in Frequency::ALL.into_iter().filter(|f| f.repeats()) {
            let draft = standup(Some(RecurrenceSpec::new(frequency, utc(2025, 3, 1, 0, 0))));
            let rules = build(&draft).recurrence.unwrap();
            assert_eq!(rules.len(), 1, "{frequency}");
            assert!(rules[0].starts_with("RRULE:FREQ="));
            assert!(rules[0].ends_with(";UNTIL=20250301T000000Z"));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let draft = standup(Some(RecurrenceSpec::new(
            Frequency::Daily,
            utc(2025, 2, 1, 8, 30),
        )));
        let first = serde_json::to_vec(&build(&draft)).unwrap();
        let second = serde_json::to_vec(&build(&draft)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn title_is_sent_as_typed() {
        let mut draft = standup(None);
        draft.title = "  Retro  ".to_string();
        assert_eq!(build(&draft).summary, "  Retro  ");
    }

    #[test]
    fn end_crosses_midnight() {
        let draft = EventDraft {
            title: "Deploy".to_string(),
            start: utc(2025, 1, 2, 23, 30),
            duration: Duration::hours(1),
            recurrence: None,
        };
        let payload = build(&draft);
        assert_eq!(payload.end.date_time, "2025-01-03T00:30:00Z");
        assert_eq!(payload.end.time_zone, "UTC");
    }
}
