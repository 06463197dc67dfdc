//! The periodic-timer callback driven by [`Envelope::Tick`](crate::Envelope::Tick).

/// Callback invoked once per tick on the owner thread.
///
/// It runs inline in the dispatch loop, so while it runs no other envelope
/// is processed. Keep it short.
///
/// Every `FnMut() + Send + 'static` closure is a tick handler.
pub trait TickHandler: Send + 'static {
    /// One timer period elapsed.
    fn on_tick(&mut self);
}

impl<F> TickHandler for F
where
    F: FnMut() + Send + 'static,
{
    fn on_tick(&mut self) {
        self()
    }
}
