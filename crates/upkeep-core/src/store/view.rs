// ── Filtered alert views ──
//
// Pure filter/sort/page pipeline over an alert snapshot: no side effects,
// deterministic for identical inputs. The rendering layer calls this on
// every relevant change instead of caching derived lists.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::{Alert, SeverityBucket};

/// Which resolution slice of the collection to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
    All,
    #[default]
    Active,
    Resolved,
}

/// Severity filter: a single display bucket, or everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeverityFilter {
    #[default]
    All,
    Bucket(SeverityBucket),
}

impl std::str::FromStr for SeverityFilter {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse::<SeverityBucket>().map(Self::Bucket)
        }
    }
}

/// Sort key for the alert table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Severity,
    Timestamp,
    Device,
    Bucket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Everything that shapes one derived view of the alert collection.
#[derive(Debug, Clone)]
pub struct AlertQuery {
    pub tab: Tab,
    pub severity: SeverityFilter,
    /// Restrict to one device id.
    pub device: Option<String>,
    /// Case-insensitive substring over message, device display name, and
    /// severity-bucket label.
    pub search: Option<String>,
    pub sort: SortKey,
    pub direction: SortDir,
    /// Zero-indexed page, sliced after filter + sort.
    pub page: usize,
    /// Rows per page. `0` disables pagination.
    pub page_size: usize,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            tab: Tab::default(),
            severity: SeverityFilter::default(),
            device: None,
            search: None,
            sort: SortKey::default(),
            direction: SortDir::default(),
            page: 0,
            page_size: 25,
        }
    }
}

/// One page of a derived view, plus enough shape to render a pager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPage {
    pub alerts: Vec<Arc<Alert>>,
    /// Alerts matching the filter across all pages.
    pub total_matched: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Compute a derived view over the given snapshot.
pub fn filtered_view(snapshot: &[Arc<Alert>], query: &AlertQuery) -> AlertPage {
    let needle = query
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    let mut matched: Vec<Arc<Alert>> = snapshot
        .iter()
        .filter(|alert| matches(alert, query, needle.as_deref()))
        .cloned()
        .collect();

    // Stable sort: ties keep the collection's prior order, which keeps
    // pagination deterministic across recomputes.
    matched.sort_by(|a, b| {
        let ordering = compare(a, b, query.sort);
        match query.direction {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });

    let total_matched = matched.len();
    let (alerts, page_count) = if query.page_size == 0 {
        (matched, 1)
    } else {
        let page_count = total_matched.div_ceil(query.page_size).max(1);
        let alerts = matched
            .into_iter()
            .skip(query.page.saturating_mul(query.page_size))
            .take(query.page_size)
            .collect();
        (alerts, page_count)
    };

    AlertPage {
        alerts,
        total_matched,
        page: query.page,
        page_count,
    }
}

fn matches(alert: &Alert, query: &AlertQuery, needle: Option<&str>) -> bool {
    match query.tab {
        Tab::All => {}
        Tab::Active => {
            if alert.acknowledged {
                return false;
            }
        }
        Tab::Resolved => {
            if !alert.acknowledged {
                return false;
            }
        }
    }

    if let SeverityFilter::Bucket(bucket) = query.severity {
        if alert.bucket() != bucket {
            return false;
        }
    }

    if let Some(ref device) = query.device {
        if alert.device_id != *device {
            return false;
        }
    }

    if let Some(needle) = needle {
        let hit = alert.message.to_lowercase().contains(needle)
            || alert.display_device().to_lowercase().contains(needle)
            || alert.bucket().label().contains(needle);
        if !hit {
            return false;
        }
    }

    true
}

fn compare(a: &Alert, b: &Alert, key: SortKey) -> Ordering {
    match key {
        SortKey::Severity => a.severity.cmp(&b.severity),
        SortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortKey::Device => a.display_device().cmp(b.display_device()),
        SortKey::Bucket => a.bucket().label().cmp(b.bucket().label()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::model::SyncState;

    fn alert(id: &str, severity: u8, device: &str, message: &str, minute: u32) -> Arc<Alert> {
        Arc::new(Alert {
            id: id.into(),
            device_id: device.to_lowercase().replace(' ', "_"),
            device_name: Some(device.into()),
            alert_type: "ANOMALY".into(),
            severity,
            message: message.into(),
            timestamp: Utc.with_ymd_and_hms(2026, 8, 20, 10, minute, 0).unwrap(),
            acknowledged: false,
            resolution_notes: None,
            resolution_timestamp: None,
            sync: SyncState::Synced,
        })
    }

    fn resolved(base: &Arc<Alert>) -> Arc<Alert> {
        let mut a = (**base).clone();
        a.acknowledged = true;
        a.resolution_notes = Some("done".into());
        a.resolution_timestamp = Some(a.timestamp);
        Arc::new(a)
    }

    #[test]
    fn search_matches_device_name_case_insensitively() {
        let snapshot = vec![
            alert("a1", 8, "Pump A", "overheat", 0),
            alert("a2", 2, "Pump B", "ok", 1),
        ];

        let query = AlertQuery {
            search: Some("pump a".into()),
            ..AlertQuery::default()
        };
        let page = filtered_view(&snapshot, &query);
        assert_eq!(page.total_matched, 1);
        assert_eq!(page.alerts[0].id, "a1");
    }

    #[test]
    fn search_matches_bucket_label() {
        let snapshot = vec![
            alert("a1", 8, "Pump A", "overheat", 0),
            alert("a2", 2, "Pump B", "sensor drift", 1),
        ];

        let query = AlertQuery {
            search: Some("crit".into()),
            ..AlertQuery::default()
        };
        let page = filtered_view(&snapshot, &query);
        assert_eq!(page.alerts.len(), 1);
        assert_eq!(page.alerts[0].id, "a1");
    }

    #[test]
    fn tabs_split_on_acknowledged() {
        let open = alert("a1", 5, "Pump A", "pressure", 0);
        let closed = resolved(&alert("a2", 9, "Pump B", "failure", 1));
        let snapshot = vec![open, closed];

        let active = filtered_view(&snapshot, &AlertQuery { tab: Tab::Active, ..AlertQuery::default() });
        assert_eq!(active.alerts.len(), 1);
        assert_eq!(active.alerts[0].id, "a1");

        let resolved_page =
            filtered_view(&snapshot, &AlertQuery { tab: Tab::Resolved, ..AlertQuery::default() });
        assert_eq!(resolved_page.alerts.len(), 1);
        assert_eq!(resolved_page.alerts[0].id, "a2");

        let all = filtered_view(&snapshot, &AlertQuery { tab: Tab::All, ..AlertQuery::default() });
        assert_eq!(all.alerts.len(), 2);
    }

    #[test]
    fn severity_filter_uses_display_buckets() {
        let snapshot = vec![
            alert("a1", 3, "Pump A", "m", 0),
            alert("a2", 4, "Pump A", "m", 1),
            alert("a3", 6, "Pump A", "m", 2),
            alert("a4", 7, "Pump A", "m", 3),
        ];

        let warnings = filtered_view(
            &snapshot,
            &AlertQuery {
                severity: SeverityFilter::Bucket(SeverityBucket::Warning),
                ..AlertQuery::default()
            },
        );
        let ids: Vec<&str> = warnings.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a2"]); // default sort: severity desc
    }

    #[test]
    fn sort_is_stable_for_ties() {
        // Same severity everywhere: the collection order must survive both
        // directions so pagination does not shuffle between recomputes.
        let snapshot = vec![
            alert("a1", 5, "Pump A", "m", 0),
            alert("a2", 5, "Pump B", "m", 0),
            alert("a3", 5, "Pump C", "m", 0),
        ];

        for direction in [SortDir::Asc, SortDir::Desc] {
            let page = filtered_view(
                &snapshot,
                &AlertQuery { sort: SortKey::Severity, direction, ..AlertQuery::default() },
            );
            let ids: Vec<&str> = page.alerts.iter().map(|a| a.id.as_str()).collect();
            assert_eq!(ids, vec!["a1", "a2", "a3"]);
        }
    }

    #[test]
    fn pagination_slices_after_filter_and_sort() {
        let snapshot: Vec<_> = (0..7)
            .map(|i| {
                #[allow(clippy::cast_possible_truncation)]
                alert(&format!("a{i}"), i as u8, "Pump A", "m", u32::from(i as u8))
            })
            .collect();

        let query = AlertQuery {
            tab: Tab::All,
            sort: SortKey::Severity,
            direction: SortDir::Asc,
            page: 1,
            page_size: 3,
            ..AlertQuery::default()
        };
        let page = filtered_view(&snapshot, &query);

        assert_eq!(page.total_matched, 7);
        assert_eq!(page.page_count, 3);
        let ids: Vec<&str> = page.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a4", "a5"]);

        // Past-the-end pages are empty, not an error.
        let past = filtered_view(&snapshot, &AlertQuery { page: 9, page_size: 3, tab: Tab::All, ..AlertQuery::default() });
        assert!(past.alerts.is_empty());
        assert_eq!(past.total_matched, 7);

        // The skip offset saturates instead of overflowing for absurd
        // page numbers.
        let absurd = filtered_view(
            &snapshot,
            &AlertQuery { page: usize::MAX, page_size: 3, tab: Tab::All, ..AlertQuery::default() },
        );
        assert!(absurd.alerts.is_empty());
        assert_eq!(absurd.total_matched, 7);
    }

    #[test]
    fn identical_inputs_give_identical_views() {
        let snapshot = vec![
            alert("a1", 8, "Pump A", "overheat", 0),
            alert("a2", 2, "Pump B", "ok", 1),
        ];
        let query = AlertQuery::default();

        let first = filtered_view(&snapshot, &query);
        let second = filtered_view(&snapshot, &query);
        let first_ids: Vec<_> = first.alerts.iter().map(|a| a.id.clone()).collect();
        let second_ids: Vec<_> = second.alerts.iter().map(|a| a.id.clone()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.total_matched, second.total_matched);
    }
}
