//! State of the inventory table view for one mount.
//!
//! A view starts `Pending`, is resolved exactly once into `Ready` or `Failed`, and owns the
//! ephemeral ui state around it: search query, sort, cursor and the detail panel.

use std::path::Path;
use tracing::{debug, trace, warn};

use crate::datasource::LoadState;
use crate::domain::ActivationToken;
use crate::export::{ExportError, ExportReport, export_records};
use crate::filter::{SortOrder, filter_records, sort_rows};
use crate::record::{DISPLAY_COLUMNS, Record, RowKey};

pub const LOADING_TEXT: &str = "Loading...";
pub const NO_DATA_TEXT: &str = "No data found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub key: RowKey,
    pub cells: Vec<String>,
}

/// What the table body shows for the current load state and filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody<'a> {
    Loading,
    Failed(&'a str),
    Empty,
    Rows(Vec<RowView>),
}

pub struct InventoryView {
    token: ActivationToken,
    load_state: LoadState,
    search_query: String,
    selected_record: Option<Record>,
    detail_visible: bool,
    detail_row: usize,
    sort: Option<SortOrder>,
    rows: Vec<usize>, // Mapping of visible row index to dataset index
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    height: usize,
}

impl InventoryView {
    pub fn mount(token: ActivationToken, height: usize) -> Self {
        debug!("Mounting inventory view {:?}", token);
        InventoryView {
            token,
            load_state: LoadState::Pending,
            search_query: String::new(),
            selected_record: None,
            detail_visible: false,
            detail_row: 0,
            sort: None,
            rows: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            height,
        }
    }

    pub fn token(&self) -> ActivationToken {
        self.token
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Apply the fetch result. Only a pending view can be resolved.
    pub fn resolve(&mut self, state: LoadState) -> bool {
        if !self.load_state.is_pending() {
            warn!("Ignoring second resolution of view {:?}", self.token);
            return false;
        }
        if state.is_pending() {
            return false;
        }
        self.load_state = state;
        self.refresh_rows();
        true
    }

    fn records(&self) -> &[Record] {
        self.load_state
            .dataset()
            .map(|d| d.as_slice())
            .unwrap_or_default()
    }

    // -------------------- Search and sort ---------------------- //

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: &str) {
        if self.search_query != query {
            self.search_query = query.to_string();
            self.refresh_rows();
        }
    }

    pub fn sort(&self) -> Option<SortOrder> {
        self.sort
    }

    pub fn sort_by_current_column(&mut self, ascending: bool) {
        self.sort = Some(SortOrder {
            column: self.curser_column,
            ascending,
        });
        self.refresh_rows();
    }

    pub fn clear_sort(&mut self) {
        if self.sort.take().is_some() {
            self.refresh_rows();
        }
    }

    fn refresh_rows(&mut self) {
        let records = self.records();
        let mut rows = filter_records(records, &self.search_query);
        if let Some(order) = self.sort {
            sort_rows(records, &mut rows, order);
        }
        trace!(
            "Query {:?} sort {:?}: {} of {} rows",
            self.search_query,
            self.sort,
            rows.len(),
            records.len()
        );
        self.rows = rows;
        self.curser_row = 0;
        self.offset_row = 0;
    }

    /// Dataset indices in display order.
    pub fn visible_rows(&self) -> &[usize] {
        &self.rows
    }

    // -------------------- Rendering projections ---------------------- //

    pub fn body(&self) -> TableBody<'_> {
        match &self.load_state {
            LoadState::Pending => TableBody::Loading,
            LoadState::Failed(message) => TableBody::Failed(message),
            LoadState::Ready(records) => {
                if self.rows.is_empty() {
                    return TableBody::Empty;
                }
                let rend = std::cmp::min(self.offset_row + self.height.max(1), self.rows.len());
                let rows = self.rows[self.offset_row..rend]
                    .iter()
                    .map(|&idx| RowView {
                        key: RowKey::for_record(&records[idx], idx),
                        cells: records[idx].display_cells(),
                    })
                    .collect();
                TableBody::Rows(rows)
            }
        }
    }

    pub fn show_search(&self) -> bool {
        !matches!(self.load_state, LoadState::Failed(_))
    }

    pub fn export_enabled(&self) -> bool {
        !self.records().is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.records().len()
    }

    /// Cursor position inside the rendered window.
    pub fn curser_row(&self) -> usize {
        self.curser_row
    }

    pub fn curser_column(&self) -> usize {
        self.curser_column
    }

    pub fn selected_index(&self) -> usize {
        self.offset_row + self.curser_row
    }

    // -------------------- Detail panel ---------------------- //

    /// Opens the detail panel for the record under the cursor.
    pub fn activate_row(&mut self) -> bool {
        let Some(&idx) = self.rows.get(self.selected_index()) else {
            return false;
        };
        let record = self.records()[idx].clone();
        debug!("Selected record {:?}", RowKey::for_record(&record, idx));
        self.select_record(record);
        true
    }

    pub fn select_record(&mut self, record: Record) {
        self.selected_record = Some(record);
        self.detail_visible = true;
        self.detail_row = 0;
    }

    /// Hides the panel, the selection stays for reopening.
    pub fn close_detail(&mut self) {
        self.detail_visible = false;
    }

    pub fn reopen_detail(&mut self) -> bool {
        if self.selected_record.is_some() {
            self.detail_visible = true;
        }
        self.detail_visible
    }

    pub fn detail_visible(&self) -> bool {
        self.detail_visible
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selected_record.as_ref()
    }

    /// Every field of the selected record as (name, value), absent values blank.
    pub fn detail_fields(&self) -> Vec<(String, String)> {
        self.selected_record
            .iter()
            .flat_map(|r| r.fields())
            .map(|(name, value)| (name.to_string(), value.unwrap_or_default().to_string()))
            .collect()
    }

    pub fn detail_row(&self) -> usize {
        self.detail_row
    }

    pub fn move_detail_selection_up(&mut self, size: usize) {
        self.detail_row = self.detail_row.saturating_sub(size);
    }

    pub fn move_detail_selection_down(&mut self, size: usize) {
        let nfields = self.selected_record.as_ref().map(Record::len).unwrap_or(0);
        if nfields > 0 {
            self.detail_row = std::cmp::min(self.detail_row + size, nfields - 1);
        }
    }

    // -------------------- Copy and export ---------------------- //

    /// Value under the cursor: the detail row when the panel is open, the table cell otherwise.
    pub fn current_value(&self) -> Option<String> {
        if self.detail_visible {
            return self
                .detail_fields()
                .into_iter()
                .nth(self.detail_row)
                .map(|(_, v)| v);
        }
        let idx = *self.rows.get(self.selected_index())?;
        let field = DISPLAY_COLUMNS.get(self.curser_column)?;
        self.records()[idx].get(field).map(str::to_string)
    }

    /// Exports the full dataset, ignoring search and sort.
    pub fn export_to(&self, path: &Path) -> Result<ExportReport, ExportError> {
        if !self.export_enabled() {
            return Err(ExportError::Empty);
        }
        export_records(self.records(), path)
    }

    // -------------------- Cursor movement ---------------------- //

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        let idx = self.selected_index();
        self.select_index(idx);
    }

    fn select_index(&mut self, idx: usize) {
        if self.rows.is_empty() {
            self.curser_row = 0;
            self.offset_row = 0;
            return;
        }
        let idx = std::cmp::min(idx, self.rows.len() - 1);
        let height = self.height.max(1);
        if idx < self.offset_row {
            // Shift table up
            self.offset_row = idx;
        } else if idx >= self.offset_row + height {
            // Shift table down
            self.offset_row = idx + 1 - height;
        }
        self.curser_row = idx - self.offset_row;
    }

    pub fn move_selection_up(&mut self, size: usize) {
        let idx = self.selected_index().saturating_sub(size);
        self.select_index(idx);
    }

    pub fn move_selection_down(&mut self, size: usize) {
        let idx = self.selected_index().saturating_add(size);
        self.select_index(idx);
    }

    pub fn move_selection_beginning(&mut self) {
        self.select_index(0);
    }

    pub fn move_selection_end(&mut self) {
        self.select_index(self.rows.len().saturating_sub(1));
    }

    pub fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    pub fn move_selection_right(&mut self) {
        self.curser_column = std::cmp::min(self.curser_column + 1, DISPLAY_COLUMNS.len() - 1);
    }
}
