use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::collections::HashSet;
use tracing::{debug, info, trace};

use crate::card::{CardContent, build_card};
use crate::dataset::Dataset;
use crate::domain::{DirectoryConfig, DirectoryError, HELP_TEXT, Message};
use crate::engine::{SortKey, StateChange, ViewState, filter_and_sort};
use crate::filter_panel::{FilterPanel, PanelView};
use crate::inputter::{InputResult, Inputter};
use crate::ui::{
    CONTROLS_HEIGHT, HEADER_HEIGHT, PANEL_CHROME_HEIGHT, STATUSLINE_HEIGHT, SUMMARY_HEIGHT,
};

const PAGE_SIZE: usize = 10;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    BROWSE,
    FILTERPANEL,
    SEARCHINPUT,
    POPUP,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub list_width: usize,
    pub list_height: usize,
    pub panel_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let list_height = ui_height
            .saturating_sub(HEADER_HEIGHT + CONTROLS_HEIGHT + SUMMARY_HEIGHT + STATUSLINE_HEIGHT);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            list_width: ui_width,
            list_height,
            panel_height: list_height.saturating_sub(PANEL_CHROME_HEIGHT),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Snapshot of everything the ui draws. Rebuilt after every change.
#[derive(Debug, Clone)]
pub struct UIData {
    pub title: String,
    pub subtitle: String,
    pub cards: Vec<CardContent>, // Cards that fit on screen, starting at the scroll offset
    pub selected_card: Option<usize>, // Index into cards
    pub nresults: usize,
    pub ntotal: usize,
    pub filter_summary: Option<String>,
    pub sort_label: &'static str,
    pub search: InputResult,
    pub active_search: bool,
    pub panel: Option<PanelView>,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: String::new(),
            subtitle: String::new(),
            cards: Vec::new(),
            selected_card: None,
            nresults: 0,
            ntotal: 0,
            filter_summary: None,
            sort_label: SortKey::default().label(),
            search: InputResult::default(),
            active_search: false,
            panel: None,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: DirectoryConfig,
    dataset: Dataset,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    state: ViewState,
    results: Vec<usize>, // Dataset indices in display order
    expanded: HashSet<usize>, // Dataset indices of expanded cards
    curser: usize,
    offset: usize,
    panel: FilterPanel,
    input: Inputter,
    last_input: InputResult,
    uilayout: UILayout,
    uidata: UIData,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &DirectoryConfig,
        dataset: Dataset,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, DirectoryError> {
        let state = ViewState::default();
        let results = filter_and_sort(&dataset, &state);
        info!(
            "Directory ready: {} airlines, {} fields",
            dataset.len(),
            dataset.fields().len()
        );
        let mut model = Self {
            config: config.clone(),
            dataset,
            status: Status::READY,
            modus: Modus::BROWSE,
            previous_modus: Modus::BROWSE,
            state,
            results,
            expanded: HashSet::new(),
            curser: 0,
            offset: 0,
            panel: FilterPanel::default(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            status_message: "Press ? for help".to_string(),
        };
        model.update_uidata();
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCHINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DirectoryError> {
        let Some(msg) = message else {
            return Ok(());
        };

        match self.modus {
            Modus::BROWSE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveDown => self.move_selection_down(1),
                Message::MovePageUp => self.move_selection_up(PAGE_SIZE),
                Message::MovePageDown => self.move_selection_down(PAGE_SIZE),
                Message::MoveBeginning => self.move_selection_up(self.results.len()),
                Message::MoveEnd => self.move_selection_down(self.results.len()),
                Message::Toggle => self.toggle_card(),
                Message::CopyLink => self.copy_link(),
                _ => self.update_common(msg),
            },
            Modus::FILTERPANEL => {
                let nfields = self.dataset.fields().len();
                match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.panel.move_up(1),
                    Message::MoveDown => self.panel.move_down(1, nfields),
                    Message::MovePageUp => self.panel.move_up(PAGE_SIZE),
                    Message::MovePageDown => self.panel.move_down(PAGE_SIZE, nfields),
                    Message::MoveBeginning => self.panel.move_beginning(),
                    Message::MoveEnd => self.panel.move_end(nfields),
                    Message::Toggle => {
                        if let Some(change) = self.panel.toggle_current(self.dataset.fields()) {
                            self.apply_change(change);
                        }
                    }
                    Message::SelectAllFields => {
                        let change = self.panel.select_all(self.dataset.fields());
                        self.apply_change(change);
                    }
                    Message::ClearAllFields => {
                        let change = self.panel.clear_all();
                        self.apply_change(change);
                    }
                    Message::Exit | Message::ToggleFilterPanel => self.close_filter_panel(),
                    _ => self.update_common(msg),
                }
            }
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.close_popup(),
                _ => (),
            },
            Modus::SEARCHINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }

        self.update_uidata();
        Ok(())
    }

    // Messages handled the same way in the list and in the filter panel
    fn update_common(&mut self, msg: Message) {
        match msg {
            Message::Search => self.enter_search_mode(),
            Message::ClearSearch => self.apply_change(StateChange::SetSearch(String::new())),
            Message::CycleSort => {
                self.apply_change(StateChange::SetSort(self.state.sort_key.next()))
            }
            Message::SortBy(key) => self.apply_change(StateChange::SetSort(key)),
            Message::ToggleFilterPanel => self.open_filter_panel(),
            Message::Help => self.show_help(),
            Message::Resize(width, height) => self.ui_resize(width, height),
            _ => (),
        }
    }

    // -------------------- State transitions ---------------------- //

    fn apply_change(&mut self, change: StateChange) {
        self.state = self.state.apply(change);
        self.refresh_results();
    }

    fn refresh_results(&mut self) {
        self.results = filter_and_sort(&self.dataset, &self.state);
        self.curser = std::cmp::min(self.curser, self.results.len().saturating_sub(1));
        self.offset = std::cmp::min(self.offset, self.curser);
        self.scroll_to_curser();
        self.set_status_message(format!(
            "{} matching, sorted by {}",
            self.results.len(),
            self.state.sort_key.label()
        ));
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.scroll_to_curser();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn open_filter_panel(&mut self) {
        if !self.panel.is_open() {
            self.panel.toggle_open();
        }
        self.previous_modus = self.modus;
        self.modus = Modus::FILTERPANEL;
    }

    fn close_filter_panel(&mut self) {
        self.panel.close();
        self.previous_modus = Modus::FILTERPANEL;
        self.modus = Modus::BROWSE;
    }

    fn enter_search_mode(&mut self) {
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCHINPUT;
        self.input.set(&self.state.search_term);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.input != self.state.search_term {
            self.apply_change(StateChange::SetSearch(self.last_input.input.clone()));
        }
        if self.last_input.finished {
            debug!("Search term \"{}\"", self.state.search_term);
            self.modus = self.previous_modus;
            self.previous_modus = Modus::SEARCHINPUT;
        }
    }

    // -------------------- Card list ---------------------- //

    fn card_for(&self, idx: usize) -> Option<CardContent> {
        let record = self.dataset.get(idx)?;
        Some(build_card(
            record,
            &self.state.selected_fields,
            self.expanded.contains(&idx),
            &self.config,
        ))
    }

    fn card_height(&self, position: usize) -> usize {
        self.results
            .get(position)
            .and_then(|&idx| self.card_for(idx))
            .map(|card| card.height(self.uilayout.list_width))
            .unwrap_or(0)
    }

    // Moves the offset until the card under the curser is fully visible, or at
    // least starts at the top of the list when it is taller than the screen.
    fn scroll_to_curser(&mut self) {
        if self.curser < self.offset {
            self.offset = self.curser;
            return;
        }
        let mut used: usize = (self.offset..=self.curser).map(|p| self.card_height(p)).sum();
        while used > self.uilayout.list_height && self.offset < self.curser {
            used -= self.card_height(self.offset);
            self.offset += 1;
        }
    }

    fn toggle_card(&mut self) {
        let Some(&idx) = self.results.get(self.curser) else {
            return;
        };
        if !self.expanded.remove(&idx) {
            self.expanded.insert(idx);
        }
        trace!("Toggled card {idx}, expanded {}", self.expanded.contains(&idx));
        self.scroll_to_curser();
    }

    fn move_selection_up(&mut self, size: usize) {
        self.curser = self.curser.saturating_sub(size);
        self.scroll_to_curser();
    }

    fn move_selection_down(&mut self, size: usize) {
        if !self.results.is_empty() {
            self.curser = std::cmp::min(self.curser + size, self.results.len() - 1);
            self.scroll_to_curser();
        }
    }

    fn copy_link(&mut self) {
        let link = self
            .results
            .get(self.curser)
            .and_then(|&idx| self.dataset.get(idx))
            .and_then(|r| r.link())
            .map(str::to_string);
        let Some(link) = link else {
            self.set_status_message("No link for this airline");
            return;
        };

        let copied = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(link.clone()));
        match copied {
            Ok(_) => {
                trace!("Copied link to clipboard.");
                self.set_status_message(format!("Copied {link}"));
            }
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message(format!("Could not copy link: {e}"));
            }
        }
    }

    // -------------------- UI data ---------------------- //

    fn visible_cards(&self) -> Vec<CardContent> {
        let mut cards = Vec::new();
        let mut used = 0;
        for &idx in self.results.iter().skip(self.offset) {
            if used >= self.uilayout.list_height {
                break;
            }
            if let Some(card) = self.card_for(idx) {
                used += card.height(self.uilayout.list_width);
                cards.push(card);
            }
        }
        cards
    }

    fn update_uidata(&mut self) {
        let cards = self.visible_cards();
        let selected_card = if self.results.is_empty() {
            None
        } else {
            Some(self.curser - self.offset)
        };
        let filter_summary = if self.state.selected_fields.is_empty() {
            None
        } else {
            Some(
                self.state
                    .selected_fields
                    .iter()
                    .cloned()
                    .collect::<Vec<String>>()
                    .join(", "),
            )
        };
        let panel = if self.panel.is_open() {
            Some(self.panel.view(
                self.dataset.fields(),
                &self.state.selected_fields,
                self.uilayout.panel_height,
            ))
        } else {
            None
        };
        let search = if self.modus == Modus::SEARCHINPUT {
            self.last_input.clone()
        } else {
            InputResult {
                input: self.state.search_term.clone(),
                curser_pos: self.state.search_term.chars().count(),
                ..InputResult::default()
            }
        };

        self.uidata = UIData {
            title: "StaffTraveler Airlines Database".to_string(),
            subtitle: format!(
                "Staff travel information for {} airlines ({})",
                self.dataset.len(),
                self.dataset.name()
            ),
            cards,
            selected_card,
            nresults: self.results.len(),
            ntotal: self.dataset.len(),
            filter_summary,
            sort_label: self.state.sort_key.label(),
            search,
            active_search: self.modus == Modus::SEARCHINPUT,
            panel,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            layout: self.uilayout.clone(),
            status_message: self.status_message.clone(),
        };
    }
}
