// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::api::{Channel, EpgMap, Program};
use chrono::{Local, NaiveDateTime};

/// Parse the leading `YYYYMMDDHHMMSS` block of an XMLTV timestamp.
///
/// Any timezone-offset suffix (e.g. `" +0000"`) is ignored and the
/// timestamp is treated as viewer-local time. That matches what the
/// backend feeds us today but is wrong near zone boundaries; do not
/// tighten this without confirming the feed's actual convention.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let block = raw.get(..14)?;
    NaiveDateTime::parse_from_str(block, "%Y%m%d%H%M%S").ok()
}

/// Format an XMLTV timestamp for display: `"20231105120000"` -> `"05/11 12:00"`.
///
/// Fixed-width slicing, no validation; short input degrades to whatever
/// pieces are present and empty input to an empty string.
pub fn format_timestamp(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let month = raw.get(4..6).unwrap_or("");
    let day = raw.get(6..8).unwrap_or("");
    let hour = raw.get(8..10).unwrap_or("");
    let min = raw.get(10..12).unwrap_or("");
    format!("{}/{} {}:{}", day, month, hour, min)
}

/// True iff both bounds parse and `now` falls within them, inclusive.
/// A programme without a usable stop time is never flagged as airing.
pub fn is_currently_airing(start: &str, stop: Option<&str>, now: NaiveDateTime) -> bool {
    let (Some(start), Some(stop)) = (parse_timestamp(start), stop.and_then(parse_timestamp))
    else {
        return false;
    };
    now >= start && now <= stop
}

/// Guide lookup key for a channel: its tvg id when present, else the
/// title. The title fallback is a fragile join key (two channels sharing
/// a title collide) but it is what the feed gives us.
pub fn guide_key(channel: &Channel) -> &str {
    channel.tvg_id.as_deref().unwrap_or(&channel.title)
}

/// A programme prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRow {
    pub title: String,
    pub start: String,
    pub stop: Option<String>,
    pub airing_now: bool,
}

/// Format a channel's guide entries in feed order, flagging the entry
/// that is on air at `now`.
pub fn program_rows(programs: &[Program], now: NaiveDateTime) -> Vec<ProgramRow> {
    programs
        .iter()
        .map(|p| ProgramRow {
            title: p.title.clone(),
            start: format_timestamp(&p.start),
            stop: p
                .stop
                .as_deref()
                .map(format_timestamp)
                .filter(|s| !s.is_empty()),
            airing_now: is_currently_airing(&p.start, p.stop.as_deref(), now),
        })
        .collect()
}

/// Look up the guide for a channel. A missing key yields an empty slice,
/// which renders as the explicit empty state rather than an error.
pub fn programs_for<'a>(channel: &Channel, epg: &'a EpgMap) -> &'a [Program] {
    epg.get(guide_key(channel)).map_or(&[], Vec::as_slice)
}

/// Rows for the selected channel at wall-clock time.
pub fn guide_rows_now(channel: &Channel, epg: &EpgMap) -> Vec<ProgramRow> {
    program_rows(programs_for(channel, epg), Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn at(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_format_timestamp_basic() {
        assert_eq!(format_timestamp("20231105120000"), "05/11 12:00");
        assert_eq!(format_timestamp("20231105120000 +0100"), "05/11 12:00");
    }

    #[test]
    fn test_format_timestamp_degrades_on_short_input() {
        assert_eq!(format_timestamp(""), "");
        assert_eq!(format_timestamp("2023"), "/ :");
        assert_eq!(format_timestamp("20231105"), "05/11 :");
    }

    #[test]
    fn test_parse_timestamp_ignores_offset_suffix() {
        assert_eq!(at("20231105120000"), at("20231105120000 +0500"));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not-a-time-at-all").is_none());
        assert!(parse_timestamp("20231399999999").is_none());
    }

    #[test]
    fn test_airing_inside_window() {
        let now = at("20231105123000");
        assert!(is_currently_airing(
            "20231105120000",
            Some("20231105130000"),
            now
        ));
    }

    #[test]
    fn test_airing_bounds_are_inclusive() {
        let start = "20231105120000";
        let stop = "20231105130000";
        assert!(is_currently_airing(start, Some(stop), at(start)));
        assert!(is_currently_airing(start, Some(stop), at(stop)));
    }

    #[test]
    fn test_not_airing_outside_window() {
        let now = at("20231105140000");
        assert!(!is_currently_airing(
            "20231105120000",
            Some("20231105130000"),
            now
        ));
    }

    #[test]
    fn test_missing_stop_never_airs() {
        let now = at("20231105123000");
        assert!(!is_currently_airing("20231105120000", None, now));
    }

    #[test]
    fn test_guide_key_falls_back_to_title() {
        let mut channel = Channel {
            title: "News 24".to_string(),
            url: String::new(),
            group: None,
            tvg_id: Some("news24.example".to_string()),
            tvg_logo: None,
        };
        assert_eq!(guide_key(&channel), "news24.example");
        channel.tvg_id = None;
        assert_eq!(guide_key(&channel), "News 24");
    }

    #[test]
    fn test_programs_for_missing_key_is_empty_not_error() {
        let channel = Channel {
            title: "Unlisted".to_string(),
            url: String::new(),
            group: None,
            tvg_id: None,
            tvg_logo: None,
        };
        let epg: EpgMap = HashMap::new();
        assert!(programs_for(&channel, &epg).is_empty());
    }

    #[test]
    fn test_program_rows_flags_only_current_entry() {
        let programs = vec![
            Program {
                start: "20231105100000".to_string(),
                stop: Some("20231105120000".to_string()),
                title: "Earlier".to_string(),
            },
            Program {
                start: "20231105120000".to_string(),
                stop: Some("20231105140000".to_string()),
                title: "Current".to_string(),
            },
            Program {
                start: "20231105140000".to_string(),
                stop: None,
                title: "Open Ended".to_string(),
            },
        ];

        let rows = program_rows(&programs, at("20231105130000"));
        assert_eq!(rows.len(), 3);
        assert!(!rows[0].airing_now);
        assert!(rows[1].airing_now);
        assert!(!rows[2].airing_now);
        assert_eq!(rows[1].start, "05/11 12:00");
        assert_eq!(rows[1].stop.as_deref(), Some("05/11 14:00"));
        assert_eq!(rows[2].stop, None);
    }
}
