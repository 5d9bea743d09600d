use serde::{Deserialize, Serialize};

use crate::api::{ApiConfig, FetchError, SearchPage};
use crate::model::FetchTicket;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Noop,

    // --- Setup / lifecycle ---
    Configure(Box<ApiConfig>),
    ViewMounted,
    ViewUnmounted,

    // --- User actions ---
    SearchSubmitted { query: String },
    LoadMoreRequested,
    ImageActivated { index: usize },
    ModalDismissed,
    EscapePressed,
    NoticeDismissed,

    // --- Capability responses ---
    #[serde(skip)]
    PageFetched {
        ticket: FetchTicket,
        result: Box<Result<SearchPage, FetchError>>,
    },
}

impl Default for Event {
    fn default() -> Self {
        Self::Noop
    }
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Configure(_) => "configure",
            Self::ViewMounted => "view_mounted",
            Self::ViewUnmounted => "view_unmounted",
            Self::SearchSubmitted { .. } => "search_submitted",
            Self::LoadMoreRequested => "load_more_requested",
            Self::ImageActivated { .. } => "image_activated",
            Self::ModalDismissed => "modal_dismissed",
            Self::EscapePressed => "escape_pressed",
            Self::NoticeDismissed => "notice_dismissed",
            Self::PageFetched { .. } => "page_fetched",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::SearchSubmitted { .. }
                | Self::LoadMoreRequested
                | Self::ImageActivated { .. }
                | Self::ModalDismissed
                | Self::EscapePressed
                | Self::NoticeDismissed
        )
    }
}
