use crux_core::capability::{Capability, CapabilityContext, Operation};

use crate::Notice;

impl Operation for Notice {
    type Output = ();
}

/// Fire-and-forget toast notifications.
pub struct Notify<Ev> {
    context: CapabilityContext<Notice, Ev>,
}

impl<Ev> Clone for Notify<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for Notify<Ev> {
    type Operation = Notice;
    type MappedSelf<MappedEv> = Notify<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Notify::new(self.context.map_event(f))
    }
}

impl<Ev> Notify<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<Notice, Ev>) -> Self {
        Self { context }
    }

    pub fn notify(&self, notice: Notice) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(notice).await;
        });
    }
}
