use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    model::{PostId, Report},
    optimistic::InFlight,
};

use super::cursor::Cursor;

/// Every report filed against one post.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub post_id: PostId,
    pub reports: Vec<Report>,
}

impl ReportGroup {
    pub fn count(&self) -> usize {
        self.reports.len()
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.reports.iter().filter_map(|report| report.created_at).max()
    }

    /// Distinct reasons, in filing order.
    pub fn reasons(&self) -> Vec<&str> {
        let mut reasons: Vec<&str> = vec![];
        for report in &self.reports {
            let reason = report.reason.trim();
            if !reason.is_empty() && !reasons.contains(&reason) {
                reasons.push(reason);
            }
        }
        reasons
    }
}

/// Most reported first, then most recently reported, then post id.
pub fn group_reports(reports: Vec<Report>) -> Vec<ReportGroup> {
    let mut groups: BTreeMap<PostId, Vec<Report>> = BTreeMap::new();
    for report in reports {
        groups.entry(report.post_id).or_default().push(report);
    }

    let mut groups: Vec<ReportGroup> = groups
        .into_iter()
        .map(|(post_id, reports)| ReportGroup { post_id, reports })
        .collect();
    groups.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then_with(|| b.latest().cmp(&a.latest()))
            .then_with(|| b.post_id.cmp(&a.post_id))
    });
    groups
}

/// State of the moderation screen.
#[derive(Debug, Clone, Default)]
pub struct Moderation {
    pub groups: Vec<ReportGroup>,
    pub cursor: Cursor,
    pub loading: bool,
    deleting: InFlight<PostId, (usize, ReportGroup)>,
}

impl Moderation {
    pub fn load(&mut self, reports: Vec<Report>) {
        self.groups = group_reports(reports);
        self.groups
            .retain(|group| !self.deleting.is_pending(&group.post_id));
        self.loading = false;
    }

    pub fn ids(&self) -> Vec<i64> {
        self.groups.iter().map(|group| group.post_id).collect()
    }

    pub fn selected(&self) -> Option<&ReportGroup> {
        let index = self.cursor.index_in(&self.ids())?;
        self.groups.get(index)
    }

    pub fn begin_delete(&mut self, id: PostId) -> bool {
        let Some(index) = self.groups.iter().position(|group| group.post_id == id) else {
            return false;
        };
        if !self.deleting.begin(id, (index, self.groups[index].clone())) {
            return false;
        }
        self.groups.remove(index);
        true
    }

    pub fn commit_delete(&mut self, id: PostId) {
        self.deleting.settle(&id);
        self.groups.retain(|group| group.post_id != id);
    }

    pub fn rollback_delete(&mut self, id: PostId) {
        if let Some((index, group)) = self.deleting.settle(&id) {
            let index = index.min(self.groups.len());
            self.groups.insert(index, group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode::parse_timestamp;

    fn report(post_id: PostId, reason: &str, at: &str) -> Report {
        Report {
            post_id,
            user_id: None,
            reason: reason.to_string(),
            email: None,
            created_at: parse_timestamp(at),
        }
    }

    #[test]
    fn groups_by_post() {
        let groups = group_reports(vec![
            report(1, "spam", "2024-01-01"),
            report(2, "rude", "2024-01-05"),
            report(1, "spam", "2024-01-02"),
            report(1, "scam", "2024-01-03"),
            report(3, "off topic", "2024-01-04"),
        ]);

        let order: Vec<(PostId, usize)> = groups.iter().map(|g| (g.post_id, g.count())).collect();
        assert_eq!(order, vec![(1, 3), (2, 1), (3, 1)]);
        assert_eq!(groups[0].reasons(), vec!["spam", "scam"]);
        assert_eq!(groups[0].latest(), parse_timestamp("2024-01-03"));
    }

    #[test]
    fn failed_delete_puts_group_back() {
        let mut moderation = Moderation::default();
        moderation.load(vec![
            report(1, "spam", "2024-01-01"),
            report(1, "spam", "2024-01-01"),
            report(2, "rude", "2024-01-05"),
        ]);

        assert!(moderation.begin_delete(1));
        assert!(!moderation.begin_delete(1));
        assert_eq!(moderation.ids(), vec![2]);

        moderation.rollback_delete(1);
        assert_eq!(moderation.ids(), vec![1, 2]);
    }
}
