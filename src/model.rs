use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::config::DashConfig;
use crate::datasource::LoadState;
use crate::domain::{ActivationToken, DashError, Effect, HELP_TEXT, Message};
use crate::export::ExportError;
use crate::inputter::{InputResult, Inputter};
use crate::inventory::InventoryView;
use crate::ui::TABLE_CHROME_HEIGHT;

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

/// Entries of the navigation drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Inventory,
    Kubernetes,
}

impl ViewKind {
    pub const ALL: [ViewKind; 2] = [ViewKind::Inventory, ViewKind::Kubernetes];

    pub fn title(&self) -> &'static str {
        match self {
            ViewKind::Inventory => "DynamoDB Data",
            ViewKind::Kubernetes => "Kubernetes Data",
        }
    }

    fn next(&self) -> Self {
        match self {
            ViewKind::Inventory => ViewKind::Kubernetes,
            ViewKind::Kubernetes => ViewKind::Inventory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modus {
    Table,
    Detail,
    Search,
    Popup,
}

pub struct Model {
    config: DashConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    drawer_open: bool,
    selected_view: ViewKind,
    inventory: Option<InventoryView>,
    next_token: u64,
    effects: Vec<Effect>,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
    last_status_message_update: Instant,
    ui_width: usize,
    ui_height: usize,
    clipboard: Option<Clipboard>,
}

impl Model {
    pub fn init(config: &DashConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            drawer_open: true,
            selected_view: ViewKind::Inventory,
            inventory: None,
            next_token: 0,
            effects: Vec::new(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: "Started infradash!".to_string(),
            last_status_message_update: Instant::now(),
            ui_width,
            ui_height,
            clipboard: None,
        };
        model.mount_inventory();
        model
    }

    /// Effects requested since the last call, in order.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // -------------------- Accessors for rendering ---------------------- //

    pub fn inventory(&self) -> Option<&InventoryView> {
        self.inventory.as_ref()
    }

    pub fn selected_view(&self) -> ViewKind {
        self.selected_view
    }

    pub fn drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn cmdinput(&self) -> &InputResult {
        &self.last_input
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn last_status_message_update(&self) -> Instant {
        self.last_status_message_update
    }

    pub fn popup_message(&self) -> Option<&str> {
        (self.modus == Modus::Popup).then_some(HELP_TEXT)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Search
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn table_height(&self) -> usize {
        self.ui_height.saturating_sub(TABLE_CHROME_HEIGHT).max(1)
    }

    // -------------------- Mounting and loading ---------------------- //

    fn mount_inventory(&mut self) {
        self.next_token += 1;
        let token = ActivationToken(self.next_token);
        self.inventory = Some(InventoryView::mount(token, self.table_height()));
        self.effects.push(Effect::Fetch(token));
        self.modus = Modus::Table;
        self.set_status_message("Loading ...");
    }

    fn unmount_inventory(&mut self) {
        if let Some(view) = self.inventory.take() {
            debug!("Unmounting inventory view {:?}", view.token());
        }
        self.modus = Modus::Table;
    }

    fn apply_loaded(&mut self, token: ActivationToken, state: LoadState) {
        let Some(view) = self.inventory.as_mut() else {
            debug!("Discarding result of {token:?}, inventory view is not mounted");
            return;
        };
        if view.token() != token {
            debug!(
                "Discarding stale result of {token:?}, current view is {:?}",
                view.token()
            );
            return;
        }
        if !view.resolve(state) {
            return;
        }
        let message = match view.load_state() {
            LoadState::Ready(records) => format!("Loaded {} records", records.len()),
            LoadState::Failed(_) => "Failed to load data, press r to retry".to_string(),
            LoadState::Pending => return,
        };
        // The search box is gone once loading failed
        if matches!(view.load_state(), LoadState::Failed(_)) && self.modus == Modus::Search {
            self.modus = Modus::Table;
        }
        self.set_status_message(message);
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_width, width, self.ui_height, height
        );
        self.ui_width = width;
        self.ui_height = height;
        let table_height = self.table_height();
        if let Some(view) = self.inventory.as_mut() {
            view.set_height(table_height);
        }
    }

    pub fn update(&mut self, message: Message) -> Result<(), DashError> {
        let msg = match message {
            Message::Loaded { token, state } => {
                self.apply_loaded(token, state);
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            msg => msg,
        };

        match self.modus {
            Modus::Table => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::ToggleDrawer => self.drawer_open = !self.drawer_open,
                Message::NextView => self.switch_view(self.selected_view.next()),
                msg if self.selected_view == ViewKind::Inventory => self.update_inventory(msg),
                _ => (),
            },
            Modus::Detail => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::MoveUp => self.with_inventory(|v| v.move_detail_selection_up(1)),
                Message::MoveDown => self.with_inventory(|v| v.move_detail_selection_down(1)),
                Message::MovePageUp => self.with_inventory(|v| v.move_detail_selection_up(10)),
                Message::MovePageDown => {
                    self.with_inventory(|v| v.move_detail_selection_down(10))
                }
                Message::CopyCell => self.copy_current_value(),
                Message::Exit => self.close_detail(),
                _ => (),
            },
            Modus::Search => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
            Modus::Popup => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.exit_popup(),
                _ => (),
            },
        }
        Ok(())
    }

    fn with_inventory(&mut self, f: impl FnOnce(&mut InventoryView)) {
        if let Some(view) = self.inventory.as_mut() {
            f(view);
        }
    }

    fn update_inventory(&mut self, msg: Message) {
        let page = self.table_height();
        match msg {
            Message::MoveUp => self.with_inventory(|v| v.move_selection_up(1)),
            Message::MoveDown => self.with_inventory(|v| v.move_selection_down(1)),
            Message::MoveLeft => self.with_inventory(|v| v.move_selection_left()),
            Message::MoveRight => self.with_inventory(|v| v.move_selection_right()),
            Message::MovePageUp => self.with_inventory(|v| v.move_selection_up(page)),
            Message::MovePageDown => self.with_inventory(|v| v.move_selection_down(page)),
            Message::MoveBeginning => self.with_inventory(|v| v.move_selection_beginning()),
            Message::MoveEnd => self.with_inventory(|v| v.move_selection_end()),
            Message::Enter => self.open_detail(),
            Message::ReopenDetail => {
                if self.inventory.as_mut().is_some_and(|v| v.reopen_detail()) {
                    self.modus = Modus::Detail;
                }
            }
            Message::Search => self.enter_search(),
            Message::Export => self.export(),
            Message::SortAscending => self.with_inventory(|v| v.sort_by_current_column(true)),
            Message::SortDescending => self.with_inventory(|v| v.sort_by_current_column(false)),
            Message::ClearSort => self.with_inventory(|v| v.clear_sort()),
            Message::CopyCell => self.copy_current_value(),
            Message::Reload => {
                let loading = self
                    .inventory
                    .as_ref()
                    .is_some_and(|v| v.load_state().is_pending());
                if loading {
                    debug!("Ignoring reload, the inventory is still loading");
                    self.set_status_message("Still loading ...");
                } else {
                    info!("Reloading inventory");
                    self.mount_inventory();
                }
            }
            _ => (),
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn switch_view(&mut self, view: ViewKind) {
        if view == self.selected_view {
            return;
        }
        trace!("Switching view {:?} -> {:?}", self.selected_view, view);
        self.selected_view = view;
        match view {
            ViewKind::Inventory => self.mount_inventory(),
            ViewKind::Kubernetes => {
                self.unmount_inventory();
                self.set_status_message(view.title());
            }
        }
    }

    fn open_detail(&mut self) {
        if self.inventory.as_mut().is_some_and(|v| v.activate_row()) {
            self.modus = Modus::Detail;
        }
    }

    fn close_detail(&mut self) {
        self.with_inventory(|v| v.close_detail());
        self.modus = Modus::Table;
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    fn exit_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
    }

    fn enter_search(&mut self) {
        let Some(view) = self.inventory.as_ref() else {
            return;
        };
        if !view.show_search() {
            return;
        }
        trace!("Entering search mode ...");
        self.input.set(view.search_query());
        self.last_input = self.input.get();
        self.previous_modus = self.modus;
        self.modus = Modus::Search;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let query = self.last_input.input.clone();
        self.with_inventory(|v| v.set_search_query(&query));

        if self.last_input.finished {
            trace!("Search finished with {:?}", query);
            self.modus = Modus::Table;
            self.previous_modus = Modus::Search;
            if let Some(view) = self.inventory.as_ref()
                && view.load_state().dataset().is_some()
            {
                let message = format!(
                    "{} of {} records match",
                    view.visible_rows().len(),
                    view.total_records()
                );
                self.set_status_message(message);
            }
        }
    }

    fn export(&mut self) {
        let Some(view) = self.inventory.as_ref() else {
            return;
        };
        let path = self.config.export_path();
        match view.export_to(&path) {
            Ok(report) => self.set_status_message(format!(
                "Exported {} records to {}",
                report.records,
                report.path.display()
            )),
            Err(ExportError::Empty) => {
                debug!("Export skipped, no records loaded");
                self.set_status_message("Nothing to export");
            }
            Err(e) => {
                error!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn copy_current_value(&mut self) {
        let Some(value) = self.inventory.as_ref().and_then(|v| v.current_value()) else {
            return;
        };
        trace!("Cell content: {}", value);

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard unavailable: {:?}", e);
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(value) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => error!("Error copying to clipboard: {:?}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::decode_payload;
    use crate::inventory::TableBody;
    use ratatui::crossterm::event::KeyCode;

    const PAYLOAD: &str = r#"[
        {"id": "i-1", "URL": "https://alpha.example", "Account": "111", "Region": "eu-north-1"},
        {"URL": "https://beta.example", "Account": "222", "Region": "us-east-1", "Owner": "ops"}
    ]"#;

    fn ready() -> LoadState {
        LoadState::Ready(decode_payload(PAYLOAD).unwrap())
    }

    fn model() -> Model {
        Model::init(&DashConfig::default(), 120, 40)
    }

    fn fetched_token(model: &mut Model) -> ActivationToken {
        match model.take_effects().as_slice() {
            [Effect::Fetch(token)] => *token,
            other => panic!("expected exactly one fetch, got {other:?}"),
        }
    }

    fn loaded(model: &mut Model, token: ActivationToken, state: LoadState) {
        model.update(Message::Loaded { token, state }).unwrap();
    }

    fn type_keys(model: &mut Model, keys: &str) {
        for c in keys.chars() {
            model.update(Message::RawKey(KeyCode::Char(c).into())).unwrap();
        }
    }

    #[test]
    fn mount_is_pending_with_one_fetch() {
        let mut model = model();
        let token = fetched_token(&mut model);
        assert_eq!(model.inventory().unwrap().load_state(), &LoadState::Pending);
        assert!(model.take_effects().is_empty());

        loaded(&mut model, token, ready());
        assert_eq!(model.inventory().unwrap().total_records(), 2);
        assert_eq!(model.status_message(), "Loaded 2 records");
    }

    #[test]
    fn results_for_old_mounts_are_discarded() {
        let mut model = model();
        let first = fetched_token(&mut model);

        model.update(Message::NextView).unwrap();
        assert!(model.inventory().is_none());
        loaded(&mut model, first, ready());
        assert!(model.inventory().is_none());

        model.update(Message::NextView).unwrap();
        let second = fetched_token(&mut model);
        assert_ne!(first, second);

        loaded(&mut model, first, ready());
        assert!(model.inventory().unwrap().load_state().is_pending());

        loaded(&mut model, second, LoadState::Failed("HTTP error! status: 500".into()));
        assert_eq!(
            model.inventory().unwrap().body(),
            TableBody::Failed("HTTP error! status: 500")
        );
    }

    #[test]
    fn reload_retries_after_failure() {
        let mut model = model();
        let token = fetched_token(&mut model);
        loaded(&mut model, token, LoadState::Failed("HTTP error! status: 500".into()));

        model.update(Message::Reload).unwrap();
        let retry = fetched_token(&mut model);
        assert!(retry > token);
        assert!(model.inventory().unwrap().load_state().is_pending());
    }

    #[test]
    fn reload_while_loading_issues_no_fetch() {
        let mut model = model();
        let token = fetched_token(&mut model);

        model.update(Message::Reload).unwrap();
        model.update(Message::Reload).unwrap();
        assert!(model.take_effects().is_empty());
        assert_eq!(model.inventory().unwrap().token(), token);
        assert!(model.inventory().unwrap().load_state().is_pending());
        assert_eq!(model.status_message(), "Still loading ...");

        // the original fetch still resolves the view
        loaded(&mut model, token, ready());
        assert_eq!(model.inventory().unwrap().total_records(), 2);
        model.update(Message::Reload).unwrap();
        assert!(fetched_token(&mut model) > token);
    }

    #[test]
    fn search_filters_on_every_keystroke() {
        let mut model = model();
        let token = fetched_token(&mut model);
        loaded(&mut model, token, ready());

        model.update(Message::Search).unwrap();
        assert!(model.raw_keyevents());
        type_keys(&mut model, "E");
        assert_eq!(model.inventory().unwrap().visible_rows(), &[0, 1]);
        type_keys(&mut model, "U-");
        assert_eq!(model.inventory().unwrap().visible_rows(), &[0]);

        model.update(Message::RawKey(KeyCode::Enter.into())).unwrap();
        assert!(!model.raw_keyevents());
        assert_eq!(model.inventory().unwrap().search_query(), "EU-");

        model.update(Message::Search).unwrap();
        model.update(Message::RawKey(KeyCode::Esc.into())).unwrap();
        assert_eq!(model.inventory().unwrap().search_query(), "");
        assert_eq!(model.inventory().unwrap().visible_rows(), &[0, 1]);
    }

    #[test]
    fn search_is_unavailable_after_failure() {
        let mut model = model();
        let token = fetched_token(&mut model);
        loaded(&mut model, token, LoadState::Failed("boom".into()));
        model.update(Message::Search).unwrap();
        assert_eq!(model.modus(), Modus::Table);
    }

    #[test]
    fn detail_panel_open_close_reopen() {
        let mut model = model();
        let token = fetched_token(&mut model);
        loaded(&mut model, token, ready());

        model.update(Message::MoveDown).unwrap();
        model.update(Message::Enter).unwrap();
        assert_eq!(model.modus(), Modus::Detail);
        let selected = model.inventory().unwrap().selected_record().cloned();
        assert_eq!(selected.as_ref().and_then(|r| r.get("Owner")), Some("ops"));

        model.update(Message::Exit).unwrap();
        assert_eq!(model.modus(), Modus::Table);
        let view = model.inventory().unwrap();
        assert!(!view.detail_visible());
        assert_eq!(view.selected_record().cloned(), selected);

        model.update(Message::MoveUp).unwrap();
        model.update(Message::ReopenDetail).unwrap();
        assert_eq!(model.modus(), Modus::Detail);
        assert_eq!(model.inventory().unwrap().selected_record().cloned(), selected);
    }

    #[test]
    fn export_writes_full_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashConfig::default().with_export_dir(dir.path());
        let mut model = Model::init(&config, 120, 40);

        // still loading, nothing is written
        model.update(Message::Export).unwrap();
        assert!(!config.export_path().exists());
        assert_eq!(model.status_message(), "Nothing to export");

        let token = fetched_token(&mut model);
        loaded(&mut model, token, ready());
        model.update(Message::Search).unwrap();
        type_keys(&mut model, "beta");
        model.update(Message::RawKey(KeyCode::Enter.into())).unwrap();

        model.update(Message::Export).unwrap();
        assert!(config.export_path().exists());
        assert!(model.status_message().starts_with("Exported 2 records"));
    }

    #[test]
    fn export_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashConfig::default().with_export_dir(dir.path().join("missing"));
        let mut model = Model::init(&config, 120, 40);
        let token = fetched_token(&mut model);
        loaded(&mut model, token, ready());

        model.update(Message::Export).unwrap();
        assert!(model.status_message().starts_with("Export failed"));
    }

    #[test]
    fn help_popup_returns_to_previous_modus() {
        let mut model = model();
        model.update(Message::Help).unwrap();
        assert!(model.popup_message().is_some());
        model.update(Message::MoveDown).unwrap();
        model.update(Message::Exit).unwrap();
        assert_eq!(model.modus(), Modus::Table);
        assert!(model.popup_message().is_none());

        model.update(Message::Quit).unwrap();
        assert_eq!(model.status, Status::Quitting);
    }

    #[test]
    fn drawer_toggles() {
        let mut model = model();
        assert!(model.drawer_open());
        model.update(Message::ToggleDrawer).unwrap();
        assert!(!model.drawer_open());
    }
}
