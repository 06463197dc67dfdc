//! The opaque, self-owning unit of work carried by [`Envelope::Work`].
//!
//! [`Envelope::Work`]: crate::Envelope::Work

/// A unit of externally defined logic that executes itself exactly once.
///
/// The engine never inspects a work item. It owns the boxed item from the
/// moment it is enqueued until it either calls [`execute`](WorkItem::execute)
/// on the owner thread or discards the item while draining on shutdown.
/// In both cases the item's captured state is released by `Drop`, so an
/// item that is never executed still frees everything it owns.
///
/// Every `FnOnce() + Send + 'static` closure is a work item.
pub trait WorkItem: Send + 'static {
    /// Run the item's logic, consuming it.
    fn execute(self: Box<Self>);
}

impl<F> WorkItem for F
where
    F: FnOnce() + Send + 'static,
{
    fn execute(self: Box<Self>) {
        (*self)()
    }
}
