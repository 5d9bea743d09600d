//! Search controller: the pagination state machine.
//!
//! Every transition is a plain function over [`SearchState`] that returns an
//! [`Outcome`] describing what the app must do next. None of them touch
//! capabilities, which keeps the rules testable without a runtime.
//!
//! ```text
//!            submit              page ok
//!   Idle ───────────▶ Loading ───────────▶ Ready ──load_more──▶ Loading
//!                        │                   ▲
//!                        │ page err          │ submit / load_more
//!                        ▼                   │
//!                      Error ────────────────┘
//! ```

use tracing::{debug, info, warn};

use crate::api::{FetchError, PageRequest, SearchPage};
use crate::model::{FetchKind, FetchTicket, ModalState, PendingFetch, Phase, SearchState};
use crate::{AppError, Notice, FIRST_PAGE};

/// What a transition asks of the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// A page to request; the ticket is already recorded as pending.
    pub fetch: Option<PageRequest>,
    pub notice: Option<Notice>,
    /// State visible to the view changed.
    pub changed: bool,
}

impl Outcome {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    fn fetch(request: PageRequest) -> Self {
        Self {
            fetch: Some(request),
            changed: true,
            notice: None,
        }
    }

    fn notice(notice: Notice, changed: bool) -> Self {
        Self {
            fetch: None,
            notice: Some(notice),
            changed,
        }
    }
}

/// Starts a fresh search. Whitespace-only queries are rejected with a notice
/// and leave the state untouched. A submit while another fetch is pending
/// supersedes it.
pub fn submit(state: &mut SearchState, raw_query: &str) -> Outcome {
    let query = raw_query.trim();
    if query.is_empty() {
        debug!("empty query rejected");
        return Outcome::notice(Notice::empty_query(), false);
    }

    if let Some(previous) = &state.pending {
        debug!(superseded = %previous.ticket, "new search supersedes pending fetch");
    }

    let ticket = state.issue_ticket();
    state.phase = Phase::Loading;
    state.pending = Some(PendingFetch {
        ticket,
        kind: FetchKind::Fresh {
            query: query.to_string(),
        },
    });
    info!(%ticket, query, "search submitted");

    Outcome::fetch(PageRequest {
        ticket,
        query: query.to_string(),
        page: FIRST_PAGE,
    })
}

/// Requests the page after the last merged one. Ignored unless the gallery is
/// settled (`Ready` or `Error`) and more results exist.
pub fn load_more(state: &mut SearchState) -> Outcome {
    if !state.can_load_more() {
        debug!(
            phase = ?state.phase,
            has_more = state.has_more(),
            "load more ignored"
        );
        return Outcome::unchanged();
    }

    let page = state.page.saturating_add(1);
    let ticket = state.issue_ticket();
    state.phase = Phase::Loading;
    state.pending = Some(PendingFetch {
        ticket,
        kind: FetchKind::NextPage { page },
    });
    debug!(%ticket, page, "loading next page");

    Outcome::fetch(PageRequest {
        ticket,
        query: state.query.clone(),
        page,
    })
}

/// Applies a fetch completion. Completions for anything but the pending
/// ticket are discarded.
pub fn page_fetched(
    state: &mut SearchState,
    ticket: FetchTicket,
    result: Result<SearchPage, FetchError>,
) -> Outcome {
    let pending = match state.pending.take() {
        Some(pending) if pending.ticket == ticket => pending,
        other => {
            state.pending = other;
            debug!(%ticket, "stale fetch completion discarded");
            return Outcome::unchanged();
        }
    };

    match result {
        Ok(page) => merge_page(state, pending.kind, page),
        Err(error) => {
            warn!(%ticket, error = %error, "search page fetch failed");
            let app_error = AppError::from(&error);
            let notice = Notice::fetch_failed(&app_error);
            state.phase = Phase::Error;
            state.last_error = Some(app_error);
            Outcome::notice(notice, true)
        }
    }
}

fn merge_page(state: &mut SearchState, kind: FetchKind, page: SearchPage) -> Outcome {
    state.phase = Phase::Ready;
    state.last_error = None;

    match kind {
        FetchKind::Fresh { query } => {
            state.page = FIRST_PAGE;
            state.modal = ModalState::default();
            if page.items.is_empty() {
                info!(query = %query, "search returned no results");
                state.query = query;
                state.images.clear();
                state.total_hits = 0;
                return Outcome::notice(Notice::no_results(), true);
            }
            state.query = query;
            state.images = page.items;
        }
        FetchKind::NextPage { page: number } => {
            state.page = number;
            if page.items.is_empty() {
                // The API stops serving before its reported total.
                state.total_hits = state.loaded_count();
                debug!(page = number, "result set exhausted early");
                return Outcome::changed();
            }
            state.images.extend(page.items);
        }
    }

    state.total_hits = page.total_hits.max(state.loaded_count());
    info!(
        page = state.page,
        loaded = state.images.len(),
        total_hits = state.total_hits,
        "page merged"
    );
    Outcome::changed()
}

/// Opens the modal on the image at `index`. Out-of-range indices are ignored.
pub fn activate_image(state: &mut SearchState, index: usize) -> Outcome {
    match state.visible_images().get(index) {
        Some(item) => {
            state.modal = ModalState::showing(item);
            Outcome::changed()
        }
        None => {
            debug!(index, "activation of unknown image ignored");
            Outcome::unchanged()
        }
    }
}

pub fn dismiss_modal(state: &mut SearchState) -> Outcome {
    if !state.modal.is_open {
        return Outcome::unchanged();
    }
    state.modal = ModalState::default();
    Outcome::changed()
}
