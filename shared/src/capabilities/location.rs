use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::config::WatchOptions;

/// Handle of a platform position watch, issued by the shell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WatchId(pub u32);

/// Starting a watch resolves once; the fixes themselves are delivered by the
/// shell as `Event::PositionChanged` tagged with the watch id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationOperation {
    StartWatch(WatchOptions),
    StopWatch(WatchId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationOutput {
    WatchStarted(WatchId),
    WatchStopped,
    Unsupported,
}

impl Operation for LocationOperation {
    type Output = LocationOutput;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start_watch<F>(&self, options: WatchOptions, make_event: F)
    where
        F: FnOnce(LocationOutput) -> Ev + Send + 'static,
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(LocationOperation::StartWatch(options))
                .await;
            ctx.update_app(make_event(output));
        });
    }

    pub fn stop_watch(&self, watch: WatchId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(LocationOperation::StopWatch(watch)).await;
        });
    }
}
