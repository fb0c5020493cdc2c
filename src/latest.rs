use log::trace;
use tokio::task::AbortHandle;

/// Generation number of a request. Only the newest one of its kind is
/// allowed to touch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Keeps at most one request of a kind alive. Starting a new request aborts
/// the previous task and invalidates its ticket, so a response that slips
/// through anyway is recognized as stale.
#[derive(Debug, Default)]
pub struct Latest {
    generation: u64,
    running: Option<AbortHandle>,
}

impl Latest {
    /// Supersedes whatever is running and hands out a fresh ticket.
    pub fn issue(&mut self) -> Ticket {
        self.cancel();
        self.generation += 1;
        Ticket(self.generation)
    }

    /// Remembers the task serving `ticket` so a newer request can abort it.
    /// A task for an already superseded ticket is aborted at once.
    pub fn attach(&mut self, ticket: Ticket, handle: AbortHandle) {
        if self.is_current(ticket) {
            self.cancel();
            self.running = Some(handle);
        } else {
            handle.abort();
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation == ticket.0
    }

    /// Accepts the response of `ticket` if it is still the newest.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            trace!("Discarding stale response {:?}", ticket);
            return false;
        }
        self.running = None;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.abort();
        }
    }
}
