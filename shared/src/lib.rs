// lib.rs - Shared core of the image search app

//! The shell-agnostic core of the image search app.
//!
//! The core owns every piece of state and makes every decision. Shells
//! (browser, native, the bundled CLI) render the [`ViewModel`] and perform
//! the [`Effect`]s the core requests, feeding results back as events.
//!
//! ```text
//! shell ──Event──▶ Core::process_event ──▶ App::update ──▶ controller
//!   ▲                                           │
//!   └──────────────── Vec<Effect> ◀─────────────┘
//! ```
//!
//! [`Core`] is the `crux_core` runtime specialised to this app; foreign shells
//! wrap it in a `crux_core::bridge::Bridge`.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod controller;
pub mod event;
pub mod model;
pub mod view;

#[cfg(feature = "native-shell")]
pub mod shell;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use api::{ApiConfig, ApiKey, ConfigError, FetchError, ImageApi, PageRequest, SearchPage};
pub use app::App;
pub use capabilities::{Capabilities, Effect, EffectFfi};
pub use event::Event;
pub use model::{FetchTicket, ImageItem, ModalState, Model, Phase, SearchState};
pub use view::{ViewModel, ViewState};

pub type Core = crux_core::Core<Effect, App>;

pub const DEFAULT_API_BASE_URL: &str = "https://pixabay.com/api/";
pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MIN_PER_PAGE: u32 = 3;
pub const MAX_PER_PAGE: u32 = 200;
pub const DEFAULT_IMAGE_TYPE: &str = "photo";
pub const DEFAULT_ORIENTATION: &str = "horizontal";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    Timeout,
    Api,
    RateLimited,
    Deserialization,
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Api => "API_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
        }
    }

    /// Whether re-triggering the same action by hand can plausibly succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::RateLimited | Self::Api)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::Network => {
                "Unable to reach the image service. Please check your connection and try again."
                    .into()
            }
            ErrorKind::Timeout => "The image service took too long to answer. Please try again.".into(),
            ErrorKind::Api => "An error occurred while fetching images.".into(),
            ErrorKind::RateLimited => {
                "Too many searches in a short time. Please wait a moment and try again.".into()
            }
            ErrorKind::Deserialization => {
                "The image service sent an unexpected answer. Please try again later.".into()
            }
            ErrorKind::Configuration => {
                "The image search is not configured correctly. Please check the API settings."
                    .into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<&FetchError> for AppError {
    fn from(error: &FetchError) -> Self {
        let kind = match error {
            FetchError::Network { .. } => ErrorKind::Network,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::Api { .. } => ErrorKind::Api,
            FetchError::RateLimited => ErrorKind::RateLimited,
            FetchError::InvalidResponse { .. } => ErrorKind::Deserialization,
            FetchError::InvalidRequest { .. } => ErrorKind::Configuration,
        };
        Self::new(kind, "Image fetch failed").with_internal(error.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, error.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    #[default]
    Info,
    Failure,
}

impl NoticeKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Failure => 5000,
        }
    }
}

/// What triggered a notice; shells may localise on this instead of `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeReason {
    EmptyQuery,
    NoResults,
    FetchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub reason: NoticeReason,
    pub kind: NoticeKind,
    pub message: String,
    pub duration_ms: u64,
}

impl Notice {
    #[must_use]
    pub fn empty_query() -> Self {
        Self::new(
            NoticeReason::EmptyQuery,
            NoticeKind::Info,
            "You cannot search by an empty field, try again.",
        )
    }

    #[must_use]
    pub fn no_results() -> Self {
        Self::new(
            NoticeReason::NoResults,
            NoticeKind::Failure,
            "Sorry, there are no images matching your search query. Please try again.",
        )
    }

    #[must_use]
    pub fn fetch_failed(error: &AppError) -> Self {
        Self::new(
            NoticeReason::FetchFailed,
            NoticeKind::Failure,
            error.user_facing_message(),
        )
    }

    fn new(reason: NoticeReason, kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            reason,
            kind,
            message: message.into(),
            duration_ms: kind.default_duration_ms(),
        }
    }
}
