//! Output line formatting.
//!
//! Each optional prefix wraps the line built so far, so with every flag set a
//! line reads `TS - GROUP - STREAM - ID - message`.

use chrono::Local;
use crossterm::style::{Color, Stylize};
use cwtail_core::time::TIME_FORMAT;
use cwtail_core::Event;

const SEPARATOR: &str = " - ";

/// Which prefixes to print and how.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineFormat {
    pub event_id: bool,
    pub stream: bool,
    pub group: bool,
    pub timestamp: bool,
    /// Render timestamps in the local timezone instead of UTC.
    pub local: bool,
    pub color: bool,
}

impl LineFormat {
    pub fn format(&self, event: &Event) -> String {
        let mut line = event.message.clone();
        if self.event_id {
            line = self.prefix(&event.event_id, Color::Yellow, line);
        }
        if self.stream {
            line = self.prefix(&event.stream, Color::Blue, line);
        }
        if self.group {
            line = self.prefix(&event.group, Color::Cyan, line);
        }
        if self.timestamp {
            let ts = self.timestamp(event);
            line = self.prefix(&ts, Color::Green, line);
        }
        line
    }

    fn timestamp(&self, event: &Event) -> String {
        let dt = event.datetime();
        if self.local {
            dt.with_timezone(&Local).format(TIME_FORMAT).to_string()
        } else {
            dt.format(TIME_FORMAT).to_string()
        }
    }

    fn prefix(&self, label: &str, color: Color, rest: String) -> String {
        if self.color {
            format!("{}{SEPARATOR}{rest}", label.with(color))
        } else {
            format!("{label}{SEPARATOR}{rest}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event() -> Event {
        Event {
            event_id: "3735928559".into(),
            // 2024-01-15T10:01:02.345Z
            timestamp: 1_705_312_862_345,
            message: "GET /orders 200".into(),
            group: "app".into(),
            stream: "web-1".into(),
        }
    }

    #[test]
    fn bare_message_by_default() {
        assert_eq!(LineFormat::default().format(&event()), "GET /orders 200");
    }

    #[test]
    fn every_prefix_in_order() {
        let format = LineFormat {
            event_id: true,
            stream: true,
            group: true,
            timestamp: true,
            ..LineFormat::default()
        };
        assert_eq!(
            format.format(&event()),
            "2024-01-15T10:01:02 - app - web-1 - 3735928559 - GET /orders 200"
        );
    }

    #[test]
    fn colour_wraps_only_the_prefix() {
        crossterm::style::force_color_output(true);
        let format = LineFormat {
            group: true,
            color: true,
            ..LineFormat::default()
        };
        let line = format.format(&event());
        assert!(line.starts_with('\u{1b}'), "{line:?}");
        assert!(line.contains("app"));
        assert!(line.ends_with(" - GET /orders 200"), "{line:?}");
    }
}
