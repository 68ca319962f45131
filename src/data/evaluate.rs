//! Status evaluation: live status record to feed result.
//!
//! Soft states are still being confirmed by Nagios, so they produce no
//! result and the dashboard keeps showing the last hard state.

use chrono::{DateTime, Utc};
use dashboard_api::Color;

use crate::source::{HostState, HostStatus, ServiceState, ServiceStatus};

use super::feed::{Feed, FeedKind, FeedResult};

/// Color for a service state.
pub fn service_color(state: ServiceState) -> Color {
    match state {
        ServiceState::Ok => Color::Green,
        ServiceState::Warning => Color::Amber,
        ServiceState::Critical => Color::Red,
        ServiceState::Unknown => Color::Default,
    }
}

/// Color for a host state.
pub fn host_color(state: HostState) -> Color {
    match state {
        HostState::Up => Color::Green,
        HostState::Down | HostState::Unreachable => Color::Red,
    }
}

/// Color for a running check, judged from the plugin output.
pub fn is_running_color(plugin_output: &str) -> Color {
    if plugin_output.to_lowercase().contains("ok") {
        Color::Green
    } else {
        Color::Red
    }
}

/// Evaluate a service feed. Returns `None` while the service is in a soft
/// state, or when the feed is not a service feed.
pub fn evaluate_service(
    feed: &Feed,
    status: &ServiceStatus,
    now: DateTime<Utc>,
) -> Option<FeedResult> {
    if !status.state_type.is_hard() {
        return None;
    }

    let color = match feed.kind {
        FeedKind::ServiceTransparent | FeedKind::ServicePing => service_color(status.current_state),
        FeedKind::ServiceIsRunning => is_running_color(&status.plugin_output),
        FeedKind::HostStatus => return None,
    };

    Some(FeedResult {
        color,
        message: status.plugin_output.clone(),
        updated_at: now,
    })
}

/// Evaluate a host feed. Returns `None` while the host is in a soft state,
/// or when the feed is not a host feed.
pub fn evaluate_host(feed: &Feed, status: &HostStatus, now: DateTime<Utc>) -> Option<FeedResult> {
    if !status.state_type.is_hard() || feed.kind != FeedKind::HostStatus {
        return None;
    }

    Some(FeedResult {
        color: host_color(status.current_state),
        message: status.plugin_output.clone(),
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feed::CustomData;
    use crate::source::StateType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn feed(kind: FeedKind) -> Feed {
        Feed {
            kind,
            integration_id: kind.integration_id(1, 1, "x"),
            api_key_name: "default".to_string(),
            name: "x".to_string(),
            description: String::new(),
            organisation_id: 1,
            page_id: 1,
            space_id: 1,
            custom_data: CustomData::default(),
            dependencies: vec![],
        }
    }

    fn service(state: ServiceState, state_type: StateType, output: &str) -> ServiceStatus {
        ServiceStatus {
            host_name: "web01".to_string(),
            service_description: "HTTP".to_string(),
            current_state: state,
            state_type,
            plugin_output: output.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_soft_state_is_suppressed() {
        let status = service(ServiceState::Critical, StateType::Soft, "HTTP CRITICAL");
        assert_eq!(evaluate_service(&feed(FeedKind::ServiceTransparent), &status, now()), None);
        assert_eq!(evaluate_service(&feed(FeedKind::ServiceIsRunning), &status, now()), None);

        let host = HostStatus {
            host_name: "web01".to_string(),
            current_state: HostState::Down,
            state_type: StateType::Soft,
            ..Default::default()
        };
        assert_eq!(evaluate_host(&feed(FeedKind::HostStatus), &host, now()), None);
    }

    #[test]
    fn test_hard_state_colors() {
        let transparent = feed(FeedKind::ServiceTransparent);
        let cases = [
            (ServiceState::Ok, Color::Green),
            (ServiceState::Warning, Color::Amber),
            (ServiceState::Critical, Color::Red),
            (ServiceState::Unknown, Color::Default),
        ];
        for (state, color) in cases {
            let status = service(state, StateType::Hard, "output");
            let result = evaluate_service(&transparent, &status, now()).unwrap();
            assert_eq!(result.color, color, "state {:?}", state);
        }
    }

    #[test]
    fn test_message_is_raw_plugin_output() {
        let status = service(
            ServiceState::Ok,
            StateType::Hard,
            "HTTP OK: HTTP/1.1 200 OK - 512 bytes",
        );
        let result = evaluate_service(&feed(FeedKind::ServicePing), &status, now()).unwrap();
        assert_eq!(result.message, "HTTP OK: HTTP/1.1 200 OK - 512 bytes");
        assert_eq!(result.updated_at, now());
    }

    #[test]
    fn test_is_running_uses_plugin_output() {
        let is_running = feed(FeedKind::ServiceIsRunning);

        let status = service(ServiceState::Warning, StateType::Hard, "PROCS Ok: 3 processes");
        assert_eq!(evaluate_service(&is_running, &status, now()).unwrap().color, Color::Green);

        let status = service(ServiceState::Ok, StateType::Hard, "No output returned");
        assert_eq!(evaluate_service(&is_running, &status, now()).unwrap().color, Color::Red);
    }

    #[test]
    fn test_host_colors() {
        let status_feed = feed(FeedKind::HostStatus);
        for (state, color) in [
            (HostState::Up, Color::Green),
            (HostState::Down, Color::Red),
            (HostState::Unreachable, Color::Red),
        ] {
            let host = HostStatus {
                host_name: "web01".to_string(),
                current_state: state,
                state_type: StateType::Hard,
                plugin_output: "PING".to_string(),
                ..Default::default()
            };
            let result = evaluate_host(&status_feed, &host, now()).unwrap();
            assert_eq!(result.color, color);
            assert_eq!(result.message, "PING");
        }
    }

    #[test]
    fn test_mismatched_feed_kind() {
        let status = service(ServiceState::Ok, StateType::Hard, "OK");
        assert_eq!(evaluate_service(&feed(FeedKind::HostStatus), &status, now()), None);
    }
}
