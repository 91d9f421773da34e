/// Callbacks into the embedding application.
///
/// Exactly one of the two fires per session that ends through navigation.
/// Sessions replaced by `open` or dropped by a page change fire neither.
/// Both are invoked outside the controller lock, so implementations may call
/// back into the controller.
pub trait TourHost: Send + Sync {
    fn on_close(&self) {}

    fn on_complete(&self) {}
}

/// Host that ignores every callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl TourHost for NoopHost {}
