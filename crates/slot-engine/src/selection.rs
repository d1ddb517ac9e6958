//! Currently highlighted date, with toggle semantics.

use chrono::NaiveDate;

/// At most one selected date.
///
/// No validation happens here; callers check
/// [`Resolver::is_selectable`](crate::resolver::Resolver::is_selectable) first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<NaiveDate>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `date`, or clear the selection if `date` is already selected.
    pub fn toggle(&mut self, date: NaiveDate) -> Option<NaiveDate> {
        self.selected = if self.selected == Some(date) {
            None
        } else {
            Some(date)
        };
        self.selected
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn is_selected(&self, date: NaiveDate) -> bool {
        self.selected == Some(date)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}
