use std::collections::BTreeMap;

use ratatui::widgets::ListState;

use livescroll::FeedItem;

pub struct App {
    /// Items in arrival order, newest first.  The subscription has already
    /// removed duplicates.
    pub items: Vec<FeedItem>,
    /// How many items each source has delivered.
    per_source: BTreeMap<String, usize>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Keep the newest item selected as items arrive.
    pub follow: bool,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last stream status message.
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            per_source: BTreeMap::new(),
            list_state: ListState::default(),
            follow: true,
            quit: false,
            status: "Waiting for items…".into(),
        }
    }

    /// Record a newly delivered item at the top of the list.
    ///
    /// When not following, the selection moves down with the item it was on.
    pub fn push(&mut self, item: FeedItem) {
        *self.per_source.entry(item.source_name.clone()).or_default() += 1;
        self.status = format!("Latest from {}", item.source_name);
        self.items.insert(0, item);

        match (self.follow, self.list_state.selected()) {
            (true, _) => self.list_state.select(Some(0)),
            (false, Some(i)) => self.list_state.select(Some(i + 1)),
            (false, None) => {}
        }
    }

    /// `source:count` pairs, sorted by source name.
    pub fn source_summary(&self) -> String {
        self.per_source
            .iter()
            .map(|(source, count)| format!("{source}:{count}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.follow = i == 0;
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.follow = i == 0;
        self.list_state.select(Some(i));
    }

    /// Jump to the newest item and resume following.
    pub fn select_first(&mut self) {
        self.follow = true;
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.follow = self.items.len() == 1;
            self.list_state.select(Some(self.items.len() - 1));
        }
    }

    pub fn toggle_follow(&mut self) {
        if self.follow {
            self.follow = false;
        } else {
            self.select_first();
        }
    }
}
