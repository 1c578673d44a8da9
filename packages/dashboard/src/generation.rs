//! Relevance guards for asynchronous results.
//!
//! Each logical resource (location, search, analysis) owns a
//! [`Generation`]. Starting a request takes a [`Ticket`]; when the result
//! comes back it is applied only if its ticket is still the latest one.
//! Superseded requests are never cancelled, their results are dropped.

/// Token identifying one request of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Monotonic request counter for one resource.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: u64,
}

impl Generation {
    /// Starts a new request, invalidating every earlier ticket.
    pub const fn next(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    /// Whether `ticket` belongs to the latest request.
    #[must_use]
    pub const fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }
}
