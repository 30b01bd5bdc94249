//! One-shot timer capability.
//!
//! The shell arms a timer for `millis` and answers with
//! [`TimerOutput::Elapsed`] when it fires, or [`TimerOutput::Cleared`] when a
//! [`TimerOperation::Clear`] for the same id got there first. Periodic work is
//! built by re-arming from the elapsed handler.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerOperation {
    Start { id: TimerId, millis: u64 },
    Clear { id: TimerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerOutput {
    Elapsed,
    Cleared,
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}

pub struct Timer<Ev> {
    context: CapabilityContext<TimerOperation, Ev>,
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}

impl<Ev> Timer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start<F>(&self, id: TimerId, after: Duration, callback: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
        Ev: Send,
    {
        let millis = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(TimerOperation::Start { id, millis })
                .await;
            ctx.update_app(callback(output));
        });
    }

    pub fn clear(&self, id: TimerId)
    where
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(TimerOperation::Clear { id }).await;
        });
    }
}
