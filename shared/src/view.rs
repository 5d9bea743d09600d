use serde::{Deserialize, Serialize};

use crate::model::{Model, Phase};
use crate::{Notice, NoticeKind, NoticeReason, FIRST_PAGE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    Idle,
    Loading,
    Ready { has_more: bool },
    Error { message: String, is_retryable: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItemView {
    /// Position in the gallery; what `ImageActivated` expects back.
    pub index: usize,
    pub id: u64,
    pub thumbnail_url: String,
    pub alt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalView {
    pub image_url: String,
    pub alt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeView {
    pub reason: NoticeReason,
    pub kind: NoticeKind,
    pub message: String,
    pub duration_ms: u64,
}

impl From<&Notice> for NoticeView {
    fn from(notice: &Notice) -> Self {
        Self {
            reason: notice.reason,
            kind: notice.kind,
            message: notice.message.clone(),
            duration_ms: notice.duration_ms,
        }
    }
}

/// Everything a shell needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub state: ViewState,
    pub query: String,
    pub page: u32,
    pub total_hits: u64,
    pub gallery: Vec<GalleryItemView>,
    pub load_more_visible: bool,
    pub modal: Option<ModalView>,
    pub notice: Option<NoticeView>,
}

pub fn build(model: &Model) -> ViewModel {
    let search = &model.search;

    let state = match search.phase {
        Phase::Idle => ViewState::Idle,
        Phase::Loading => ViewState::Loading,
        Phase::Ready => ViewState::Ready {
            has_more: search.has_more(),
        },
        Phase::Error => match &search.last_error {
            Some(error) => ViewState::Error {
                message: error.user_facing_message(),
                is_retryable: error.is_retryable(),
            },
            None => ViewState::Error {
                message: String::new(),
                is_retryable: true,
            },
        },
    };

    let gallery = search
        .visible_images()
        .iter()
        .enumerate()
        .map(|(index, item)| GalleryItemView {
            index,
            id: item.id,
            thumbnail_url: item.thumbnail_url.clone(),
            alt: item.description.clone(),
        })
        .collect();

    // A fresh search starts over from page one; its counters show as reset
    // until the first page lands.
    let (query, page, total_hits) = match search.pending_query() {
        Some(query) => (query.to_string(), FIRST_PAGE, 0),
        None => (search.query.clone(), search.page, search.total_hits),
    };

    let modal = search.modal.is_open.then(|| ModalView {
        image_url: search.modal.image_url.clone(),
        alt: search.modal.alt_text.clone(),
    });

    ViewModel {
        state,
        query,
        page,
        total_hits,
        gallery,
        load_more_visible: search.can_load_more(),
        modal,
        notice: model.notice.as_ref().map(NoticeView::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchKind, FetchTicket, ImageItem, ModalState, PendingFetch};
    use crate::{AppError, ErrorKind};

    fn model_with(count: u64, total_hits: u64, phase: Phase) -> Model {
        let mut model = Model::default();
        model.search.query = "cats".into();
        model.search.phase = phase;
        model.search.total_hits = total_hits;
        model.search.images = (0..count)
            .map(|id| ImageItem {
                id,
                thumbnail_url: format!("https://cdn.example.com/{id}_640.jpg"),
                full_url: format!("https://cdn.example.com/{id}_1280.jpg"),
                description: format!("cat {id}"),
            })
            .collect();
        model
    }

    #[test]
    fn test_idle_view() {
        let view = build(&Model::default());
        assert_eq!(view.state, ViewState::Idle);
        assert!(view.gallery.is_empty());
        assert!(!view.load_more_visible);
        assert!(view.modal.is_none());
        assert!(view.notice.is_none());
    }

    #[test]
    fn test_ready_with_more() {
        let view = build(&model_with(12, 120, Phase::Ready));
        assert_eq!(view.state, ViewState::Ready { has_more: true });
        assert!(view.load_more_visible);
        assert_eq!(view.gallery.len(), 12);
        assert_eq!(view.gallery[5].index, 5);
        assert_eq!(view.gallery[5].alt, "cat 5");
    }

    #[test]
    fn test_load_more_hidden_while_loading() {
        let mut model = model_with(12, 120, Phase::Loading);
        model.search.pending = Some(PendingFetch {
            ticket: FetchTicket(2),
            kind: FetchKind::NextPage { page: 2 },
        });
        let view = build(&model);
        assert_eq!(view.state, ViewState::Loading);
        assert!(!view.load_more_visible);
        assert_eq!(view.gallery.len(), 12);
    }

    #[test]
    fn test_fresh_search_shows_pending_query_from_page_one() {
        let mut model = model_with(24, 120, Phase::Loading);
        model.search.page = 2;
        model.search.pending = Some(PendingFetch {
            ticket: FetchTicket(3),
            kind: FetchKind::Fresh {
                query: "dogs".into(),
            },
        });

        let view = build(&model);
        assert_eq!(view.query, "dogs");
        assert_eq!(view.page, FIRST_PAGE);
        assert_eq!(view.total_hits, 0);
        assert!(view.gallery.is_empty());
        assert!(!view.load_more_visible);
        assert_eq!(view.state, ViewState::Loading);

        // The last good results are still there should the search fail.
        assert_eq!(model.search.query, "cats");
        assert_eq!(model.search.images.len(), 24);
    }

    #[test]
    fn test_load_more_hidden_when_exhausted() {
        let view = build(&model_with(24, 24, Phase::Ready));
        assert!(!view.load_more_visible);
    }

    #[test]
    fn test_error_keeps_gallery_and_load_more() {
        let mut model = model_with(12, 120, Phase::Error);
        model.search.last_error = Some(AppError::new(ErrorKind::Timeout, "Image fetch failed"));
        let view = build(&model);
        assert_eq!(
            view.state,
            ViewState::Error {
                message: "The image service took too long to answer. Please try again.".into(),
                is_retryable: true,
            }
        );
        assert_eq!(view.gallery.len(), 12);
        assert!(view.load_more_visible);
    }

    #[test]
    fn test_modal_projection() {
        let mut model = model_with(3, 3, Phase::Ready);
        model.search.modal = ModalState::showing(&model.search.images[1].clone());
        let modal = build(&model).modal.unwrap();
        assert_eq!(modal.image_url, "https://cdn.example.com/1_1280.jpg");
        assert_eq!(modal.alt, "cat 1");
    }

    #[test]
    fn test_view_state_serializes_tagged() {
        let json = serde_json::to_value(ViewState::Ready { has_more: true }).unwrap();
        assert_eq!(json["type"], "ready");
        assert_eq!(json["has_more"], true);
    }
}
