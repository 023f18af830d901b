use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertOperation {
    pub message: String,
}

impl Operation for AlertOperation {
    type Output = ();
}

/// Blocking user-facing notices. Fire and forget.
pub struct Alert<Ev> {
    context: CapabilityContext<AlertOperation, Ev>,
}

impl<Ev> Capability<Ev> for Alert<Ev> {
    type Operation = AlertOperation;
    type MappedSelf<MappedEv> = Alert<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Alert::new(self.context.map_event(f))
    }
}

impl<Ev> Alert<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<AlertOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(AlertOperation { message }).await;
        });
    }
}
