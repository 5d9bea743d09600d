use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, Key};
use crate::controller::{self, Outcome};
use crate::event::Event;
use crate::model::Model;
use crate::view::{self, ViewModel};

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_user_initiated() {
            debug!(event = event.name(), "user action");
        }

        match event {
            Event::Noop => {}

            Event::Configure(config) => {
                if let Err(e) = config.validate() {
                    warn!(error = %e, "api configuration is incomplete; searches will fail");
                } else {
                    info!(per_page = config.per_page, "api configured");
                }
                model.config = *config;
            }

            Event::ViewMounted => {
                // Replacing an existing binding drops (and releases) it.
                model.escape_binding =
                    Some(caps.keyboard().subscribe(Key::Escape, || Event::EscapePressed));
                caps.render().render();
            }

            Event::ViewUnmounted => {
                model.escape_binding = None;
            }

            Event::SearchSubmitted { query } => {
                let outcome = controller::submit(&mut model.search, &query);
                Self::apply(outcome, model, caps);
            }

            Event::LoadMoreRequested => {
                let outcome = controller::load_more(&mut model.search);
                Self::apply(outcome, model, caps);
            }

            Event::PageFetched { ticket, result } => {
                let outcome = controller::page_fetched(&mut model.search, ticket, *result);
                Self::apply(outcome, model, caps);
            }

            Event::ImageActivated { index } => {
                let outcome = controller::activate_image(&mut model.search, index);
                Self::apply(outcome, model, caps);
            }

            Event::ModalDismissed => {
                let outcome = controller::dismiss_modal(&mut model.search);
                Self::apply(outcome, model, caps);
            }

            Event::EscapePressed => {
                if !model.is_mounted() {
                    debug!("escape ignored while unmounted");
                    return;
                }
                let outcome = controller::dismiss_modal(&mut model.search);
                Self::apply(outcome, model, caps);
            }

            Event::NoticeDismissed => {
                if model.clear_notice() {
                    caps.render().render();
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}

impl App {
    /// Carries out a controller outcome: issue the fetch, raise the notice,
    /// and render if anything visible changed.
    fn apply(outcome: Outcome, model: &mut Model, caps: &Capabilities) {
        let Outcome {
            fetch,
            notice,
            changed,
        } = outcome;

        let notified = notice.is_some();
        if let Some(notice) = notice {
            model.show_notice(notice.clone());
            caps.notify().notify(notice);
        }

        if let Some(request) = fetch {
            let ticket = request.ticket;
            let sent = caps
                .images()
                .fetch_page(&model.config, &request, move |result| Event::PageFetched {
                    ticket,
                    result: Box::new(result),
                });
            if let Err(error) = sent {
                // Surface through the normal failure path so the phase settles.
                let failed = controller::page_fetched(&mut model.search, ticket, Err(error));
                Self::apply(failed, model, caps);
                return;
            }
        }

        if changed || notified {
            caps.render().render();
        }
    }
}
