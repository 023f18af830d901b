use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WakeLockId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WakeLockOperation {
    Acquire,
    Release(WakeLockId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WakeLockOutput {
    Acquired(WakeLockId),
    Released,
    Unavailable(String),
}

impl Operation for WakeLockOperation {
    type Output = WakeLockOutput;
}

/// Keeps the screen on while guiding.
pub struct WakeLock<Ev> {
    context: CapabilityContext<WakeLockOperation, Ev>,
}

impl<Ev> Capability<Ev> for WakeLock<Ev> {
    type Operation = WakeLockOperation;
    type MappedSelf<MappedEv> = WakeLock<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        WakeLock::new(self.context.map_event(f))
    }
}

impl<Ev> WakeLock<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<WakeLockOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn acquire<F>(&self, make_event: F)
    where
        F: FnOnce(WakeLockOutput) -> Ev + Send + 'static,
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(WakeLockOperation::Acquire).await;
            ctx.update_app(make_event(output));
        });
    }

    pub fn release(&self, lock: WakeLockId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(WakeLockOperation::Release(lock)).await;
        });
    }
}
