/// Selection in a list whose rows can appear or vanish underneath it.
/// Follows the selected id; falls back to the old index when that id is gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    id: Option<i64>,
    index: usize,
}

impl Cursor {
    pub fn resolve(&mut self, ids: &[i64]) -> Option<usize> {
        if ids.is_empty() {
            self.id = None;
            self.index = 0;
            return None;
        }
        let index = self
            .id
            .and_then(|id| ids.iter().position(|candidate| *candidate == id))
            .unwrap_or_else(|| self.index.min(ids.len() - 1));
        self.index = index;
        self.id = Some(ids[index]);
        Some(index)
    }

    /// Index to draw at, without updating the cursor.
    pub fn index_in(&self, ids: &[i64]) -> Option<usize> {
        let mut cursor = *self;
        cursor.resolve(ids)
    }

    pub fn selected(&self) -> Option<i64> {
        self.id
    }

    pub fn move_by(&mut self, ids: &[i64], delta: isize) -> Option<i64> {
        let index = self.resolve(ids)?;
        let index = index.saturating_add_signed(delta).min(ids.len() - 1);
        self.index = index;
        self.id = Some(ids[index]);
        self.id
    }

    pub fn top(&mut self, ids: &[i64]) {
        self.index = 0;
        self.id = ids.first().copied();
    }
}
