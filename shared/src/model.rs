use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::ApiConfig;
use crate::capabilities::KeySubscription;
use crate::{AppError, Notice, FIRST_PAGE};

/// Identifies one fetch; completions carrying any other ticket are stale.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FetchTicket(pub u64);

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch-{}", self.0)
    }
}

/// One search result. Immutable once received.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageItem {
    pub id: u64,
    pub thumbnail_url: String,
    pub full_url: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModalState {
    pub is_open: bool,
    pub image_url: String,
    pub alt_text: String,
}

impl ModalState {
    #[must_use]
    pub fn showing(item: &ImageItem) -> Self {
        Self {
            is_open: true,
            image_url: item.full_url.clone(),
            alt_text: item.description.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
    /// Page 1 of a newly submitted query.
    Fresh { query: String },
    /// The page after the last merged one, for the current query.
    NextPage { page: u32 },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingFetch {
    pub ticket: FetchTicket,
    pub kind: FetchKind,
}

/// Pagination and gallery state, owned by the search controller.
///
/// While a fresh search is loading, the previous results stay here so that a
/// failed attempt leaves `images` and `page` untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub page: u32,
    pub images: Vec<ImageItem>,
    pub total_hits: u64,
    pub phase: Phase,
    pub modal: ModalState,
    pub pending: Option<PendingFetch>,
    pub last_error: Option<AppError>,
    next_ticket: u64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: FIRST_PAGE,
            images: Vec::new(),
            total_hits: 0,
            phase: Phase::Idle,
            modal: ModalState::default(),
            pending: None,
            last_error: None,
            next_ticket: 0,
        }
    }
}

impl SearchState {
    pub fn loaded_count(&self) -> u64 {
        self.images.len() as u64
    }

    /// Fewer images are loaded than the API reported matches.
    pub fn has_more(&self) -> bool {
        self.loaded_count() < self.total_hits
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Load-More is offered from `Ready` and from the last-known-good
    /// gallery of `Error`, never while a fetch is in flight.
    pub fn can_load_more(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Error)
            && !self.query.is_empty()
            && self.has_more()
    }

    /// The query of a fresh search still in flight, if any.
    pub fn pending_query(&self) -> Option<&str> {
        match &self.pending {
            Some(PendingFetch {
                kind: FetchKind::Fresh { query },
                ..
            }) => Some(query.as_str()),
            _ => None,
        }
    }

    /// Images the gallery should show right now. Empty while a fresh
    /// search is pending, since its results will replace the current ones.
    pub fn visible_images(&self) -> &[ImageItem] {
        if self.pending_query().is_some() {
            &[]
        } else {
            &self.images
        }
    }

    pub(crate) fn issue_ticket(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        FetchTicket(self.next_ticket)
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Model {
    pub config: ApiConfig,
    pub search: SearchState,
    pub notice: Option<Notice>,

    /// Escape-key binding, held only while the view is mounted.
    #[serde(skip)]
    pub escape_binding: Option<KeySubscription>,
}

impl Model {
    pub fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) -> bool {
        self.notice.take().is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.escape_binding.is_some()
    }
}
