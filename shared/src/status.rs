//! Tracking of complaints that were already registered.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ComplaintStatus {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn display_text(self) -> &'static str {
        match self {
            Self::Pending => "Pending Review",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
            Self::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Pending => "time",
            Self::InProgress => "build",
            Self::Resolved => "checkmark-done",
            Self::Rejected => "close-circle",
            Self::Unknown => "help",
        }
    }

    /// Fill level of the card's progress bar, in percent.
    #[must_use]
    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::Pending => 33,
            Self::InProgress => 66,
            Self::Resolved | Self::Rejected | Self::Unknown => 100,
        }
    }

    /// Fill level as a fraction of one.
    #[must_use]
    pub fn progress(self) -> f32 {
        match self {
            Self::Pending => 1.0 / 3.0,
            Self::InProgress => 2.0 / 3.0,
            Self::Resolved | Self::Rejected | Self::Unknown => 1.0,
        }
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub date: String,
    pub message: String,
    pub status: ComplaintStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub date: String,
    pub location: String,
    #[serde(default)]
    pub updates: Vec<StatusUpdate>,
}

impl ComplaintRecord {
    #[must_use]
    pub fn category_label(&self) -> &'static str {
        catalog::label_of(Some(&self.category))
    }

    #[must_use]
    pub fn category_icon(&self) -> &'static str {
        Category::from_code(&self.category).map_or(Category::Other.icon(), Category::icon)
    }

    /// Updates newest first. ISO dates sort lexicographically.
    #[must_use]
    pub fn timeline(&self) -> Vec<&StatusUpdate> {
        let mut updates: Vec<&StatusUpdate> = self.updates.iter().collect();
        updates.sort_by(|a, b| b.date.cmp(&a.date));
        updates
    }

    #[must_use]
    pub fn latest_update(&self) -> Option<&StatusUpdate> {
        self.updates.iter().max_by(|a, b| a.date.cmp(&b.date))
    }

    /// Body of the detail alert shown when a card is tapped.
    #[must_use]
    pub fn detail_text(&self) -> String {
        format!("Status: {}\n\n{}", self.status.display_text(), self.description)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Resolved,
}

impl StatusFilter {
    pub const ALL: [Self; 4] = [Self::All, Self::Pending, Self::InProgress, Self::Resolved];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }

    #[must_use]
    pub fn matches(self, status: ComplaintStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == ComplaintStatus::Pending,
            Self::InProgress => status == ComplaintStatus::InProgress,
            Self::Resolved => status == ComplaintStatus::Resolved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyState {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBoard {
    records: Vec<ComplaintRecord>,
    filter: StatusFilter,
}

impl StatusBoard {
    #[must_use]
    pub fn new(records: Vec<ComplaintRecord>) -> Self {
        Self {
            records,
            filter: StatusFilter::All,
        }
    }

    pub fn replace_records(&mut self, records: Vec<ComplaintRecord>) {
        self.records = records;
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    #[must_use]
    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    #[must_use]
    pub fn records(&self) -> &[ComplaintRecord] {
        &self.records
    }

    #[must_use]
    pub fn visible(&self) -> Vec<&ComplaintRecord> {
        self.records
            .iter()
            .filter(|r| self.filter.matches(r.status))
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let count = self.visible().len();
        let plural = if count == 1 { "" } else { "s" };
        format!("{count} complaint{plural} found")
    }

    /// `None` while at least one complaint is visible.
    #[must_use]
    pub fn empty_state(&self) -> Option<EmptyState> {
        if !self.visible().is_empty() {
            return None;
        }
        let message = match self.filter {
            StatusFilter::All => "You haven't registered any complaints yet.".to_string(),
            other => format!("No {} complaints found.", other.code()),
        };
        Some(EmptyState {
            title: "No complaints found".to_string(),
            message,
        })
    }

    #[must_use]
    pub fn stats(&self) -> ProfileStats {
        ProfileStats::from_records(&self.records)
    }
}

/// Counters on the profile screen. `pending` counts every complaint that is
/// still open, in review or in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
}

impl ProfileStats {
    #[must_use]
    pub fn from_records(records: &[ComplaintRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            if record.status == ComplaintStatus::Resolved {
                stats.resolved += 1;
            }
            if record.status.is_open() {
                stats.pending += 1;
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, category: &str, status: ComplaintStatus) -> ComplaintRecord {
        ComplaintRecord {
            id: id.into(),
            title: format!("Complaint {id}"),
            category: category.into(),
            description: "Light pole #45 not functioning".into(),
            status,
            date: "2024-01-15".into(),
            location: "Oak Avenue".into(),
            updates: vec![],
        }
    }

    fn board() -> StatusBoard {
        StatusBoard::new(vec![
            record("1", "potholes", ComplaintStatus::InProgress),
            record("2", "garbage", ComplaintStatus::Resolved),
            record("3", "lighting", ComplaintStatus::Pending),
        ])
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_display_text_and_progress() {
            assert_eq!(ComplaintStatus::Pending.display_text(), "Pending Review");
            assert_eq!(ComplaintStatus::Pending.progress_percent(), 33);
            assert_eq!(ComplaintStatus::InProgress.progress_percent(), 66);
            assert_eq!(ComplaintStatus::Resolved.progress_percent(), 100);
            assert_eq!(ComplaintStatus::Rejected.progress_percent(), 100);
            assert!((ComplaintStatus::InProgress.progress() - 2.0 / 3.0).abs() < f32::EPSILON);
            assert!((ComplaintStatus::Rejected.progress() - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn test_wire_codes() {
            let parsed: ComplaintStatus = serde_json::from_str("\"in-progress\"").unwrap();
            assert_eq!(parsed, ComplaintStatus::InProgress);
            let parsed: ComplaintStatus = serde_json::from_str("\"escalated\"").unwrap();
            assert_eq!(parsed, ComplaintStatus::Unknown);
            assert_eq!(parsed.display_text(), "Unknown");
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn test_category_presentation() {
            let r = record("1", "safety", ComplaintStatus::Pending);
            assert_eq!(r.category_label(), "Public Safety");
            assert_eq!(r.category_icon(), "shield-checkmark");

            let r = record("2", "noise", ComplaintStatus::Pending);
            assert_eq!(r.category_label(), crate::PLACEHOLDER_LABEL);
            assert_eq!(r.category_icon(), "alert-circle");
        }

        #[test]
        fn test_timeline_is_newest_first() {
            let mut r = record("1", "potholes", ComplaintStatus::InProgress);
            r.updates = vec![
                StatusUpdate {
                    date: "2024-01-15".into(),
                    message: "Complaint registered successfully".into(),
                    status: ComplaintStatus::Pending,
                },
                StatusUpdate {
                    date: "2024-01-16".into(),
                    message: "Issue assigned to maintenance team".into(),
                    status: ComplaintStatus::InProgress,
                },
            ];
            let timeline = r.timeline();
            assert_eq!(timeline[0].date, "2024-01-16");
            assert_eq!(
                r.latest_update().map(|u| u.status),
                Some(ComplaintStatus::InProgress)
            );
        }

        #[test]
        fn test_detail_text() {
            let r = record("3", "lighting", ComplaintStatus::Pending);
            assert_eq!(
                r.detail_text(),
                "Status: Pending Review\n\nLight pole #45 not functioning"
            );
        }

        #[test]
        fn test_updates_default_to_empty() {
            let json = r#"{"id":"9","title":"t","category":"water","description":"d",
                "status":"resolved","date":"2024-02-01","location":"x"}"#;
            let r: ComplaintRecord = serde_json::from_str(json).unwrap();
            assert!(r.updates.is_empty());
            assert!(r.latest_update().is_none());
        }
    }

    mod board_tests {
        use super::*;

        #[test]
        fn test_filtering_and_summary() {
            let mut board = board();
            assert_eq!(board.summary(), "3 complaints found");

            board.set_filter(StatusFilter::Resolved);
            assert_eq!(board.summary(), "1 complaint found");
            assert_eq!(board.visible()[0].id, "2");
            assert!(board.empty_state().is_none());
        }

        #[test]
        fn test_empty_states() {
            let mut board = StatusBoard::default();
            let empty = board.empty_state().unwrap();
            assert_eq!(empty.title, "No complaints found");
            assert_eq!(empty.message, "You haven't registered any complaints yet.");

            board.replace_records(vec![record("1", "water", ComplaintStatus::Resolved)]);
            board.set_filter(StatusFilter::InProgress);
            assert_eq!(
                board.empty_state().unwrap().message,
                "No in-progress complaints found."
            );
            assert_eq!(board.summary(), "0 complaints found");
        }

        #[test]
        fn test_rejected_only_visible_under_all() {
            let board = StatusBoard::new(vec![record("1", "parks", ComplaintStatus::Rejected)]);
            for filter in StatusFilter::ALL {
                let expected = usize::from(filter == StatusFilter::All);
                let mut b = board.clone();
                b.set_filter(filter);
                assert_eq!(b.visible().len(), expected, "filter {}", filter.code());
            }
        }

        #[test]
        fn test_profile_stats() {
            let stats = board().stats();
            assert_eq!(
                stats,
                ProfileStats {
                    total: 3,
                    resolved: 1,
                    pending: 2
                }
            );
            assert_eq!(ProfileStats::from_records(&[]), ProfileStats::default());
        }
    }
}
