mod keyboard;
mod notify;

use crux_core::capability::ProtoContext;
use crux_core::render::RenderOperation;
use crux_core::Request;
use crux_http::protocol::HttpRequest;
use serde::{Deserialize, Serialize};

// Crux's built-in Render capability covers view updates as is.
pub use crux_core::render::Render;
pub use crux_http::Http;

pub use self::keyboard::{Key, KeySubscription, Keyboard, KeyboardOperation, SubscriptionId};
pub use self::notify::Notify;

use crate::api::ImageApi;
use crate::event::Event;
use crate::Notice;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;
pub type AppNotify = Notify<Event>;
pub type AppKeyboard = Keyboard<Event>;

pub struct Capabilities {
    pub http: AppHttp,
    pub render: AppRender,
    pub notify: AppNotify,
    pub keyboard: AppKeyboard,
}

impl Capabilities {
    pub fn http(&self) -> &AppHttp {
        &self.http
    }

    pub fn render(&self) -> &AppRender {
        &self.render
    }

    pub fn notify(&self) -> &AppNotify {
        &self.notify
    }

    pub fn keyboard(&self) -> &AppKeyboard {
        &self.keyboard
    }

    /// The image-search client, layered on the HTTP capability.
    pub fn images(&self) -> ImageApi<'_> {
        ImageApi::new(&self.http)
    }
}

/// Side effects the core asks the shell to perform.
///
/// Written out by hand rather than derived: the `Effect` derive shipped with
/// the crux_macros release that crux_core 0.7.6 resolves to emits a
/// `WithContext` impl keyed on the event type instead of the app.
#[derive(Debug)]
pub enum Effect {
    /// Perform the request and resolve it with an `HttpResult`.
    Http(Request<HttpRequest>),
    /// Install or remove a key listener; subscriptions resolve once per press.
    Keyboard(Request<KeyboardOperation>),
    /// Show a transient notification.
    Notify(Request<Notice>),
    /// Re-read the view model.
    Render(Request<RenderOperation>),
}

/// Serializable form of [`Effect`] handed across the FFI bridge.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Effect")]
pub enum EffectFfi {
    Http(HttpRequest),
    Keyboard(KeyboardOperation),
    Notify(Notice),
    Render(RenderOperation),
}

impl Effect {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Keyboard(_) => "keyboard",
            Self::Notify(_) => "notify",
            Self::Render(_) => "render",
        }
    }
}

impl crux_core::Effect for Effect {
    type Ffi = EffectFfi;

    fn serialize(self) -> (Self::Ffi, crux_core::bridge::ResolveSerialized) {
        match self {
            Self::Http(request) => request.serialize(EffectFfi::Http),
            Self::Keyboard(request) => request.serialize(EffectFfi::Keyboard),
            Self::Notify(request) => request.serialize(EffectFfi::Notify),
            Self::Render(request) => request.serialize(EffectFfi::Render),
        }
    }
}

impl crux_core::WithContext<crate::App, Effect> for Capabilities {
    fn new_with_context(context: ProtoContext<Effect, Event>) -> Self {
        Self {
            http: Http::new(context.specialize(Effect::Http)),
            render: Render::new(context.specialize(Effect::Render)),
            notify: Notify::new(context.specialize(Effect::Notify)),
            keyboard: Keyboard::new(context.specialize(Effect::Keyboard)),
        }
    }
}
