use std::collections::BTreeSet;
use tracing::trace;

use crate::card::field_label;
use crate::engine::StateChange;

/// Checkbox list over the discovered fields. The panel never owns the
/// selection, it only proposes [`StateChange`]s to the root view.
#[derive(Debug, Default)]
pub struct FilterPanel {
    open: bool,
    curser: usize,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub label: String,
    pub checked: bool,
    pub under_curser: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub title: String,
    pub entries: Vec<PanelEntry>,
}

pub fn panel_title(nselected: usize) -> String {
    format!("Filter by Fields ({nselected} selected)")
}

impl FilterPanel {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle_open(&mut self) {
        self.open = !self.open;
        trace!("Filter panel open: {}", self.open);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn move_up(&mut self, size: usize) {
        self.curser = self.curser.saturating_sub(size);
    }

    pub fn move_down(&mut self, size: usize, nfields: usize) {
        if nfields > 0 {
            self.curser = std::cmp::min(self.curser + size, nfields - 1);
        }
    }

    pub fn move_beginning(&mut self) {
        self.curser = 0;
    }

    pub fn move_end(&mut self, nfields: usize) {
        self.curser = nfields.saturating_sub(1);
    }

    pub fn toggle_current(&self, fields: &[String]) -> Option<StateChange> {
        fields
            .get(self.curser)
            .map(|f| StateChange::ToggleFields(vec![f.clone()]))
    }

    pub fn select_all(&self, fields: &[String]) -> StateChange {
        StateChange::SelectFields(fields.to_vec())
    }

    pub fn clear_all(&self) -> StateChange {
        StateChange::ClearFields
    }

    /// Window of `height` entries around the curser.
    pub fn view(
        &mut self,
        fields: &[String],
        selected: &BTreeSet<String>,
        height: usize,
    ) -> PanelView {
        let height = height.max(1);
        if self.curser < self.offset {
            self.offset = self.curser;
        } else if self.curser >= self.offset + height {
            self.offset = self.curser + 1 - height;
        }

        let entries = fields
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(height)
            .map(|(idx, f)| PanelEntry {
                label: field_label(f),
                checked: selected.contains(f),
                under_curser: idx == self.curser,
            })
            .collect();

        PanelView {
            title: panel_title(selected.len()),
            entries,
        }
    }
}
