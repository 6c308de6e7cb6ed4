//! Per-target row limiting

/// Yields at most `limit` items from the wrapped stream.
///
/// The wrapped stream is dropped as soon as the last allowed item has been
/// yielded, or when it runs out, so its resources are released without
/// waiting for the consumer to drop the limiter.
pub struct Limited<S> {
    inner: Option<S>,
    remaining: Option<usize>,
}

impl<S> Limited<S> {
    /// Wrap a stream; `None` means unlimited
    pub fn new(inner: S, limit: Option<usize>) -> Self {
        let inner = if limit == Some(0) { None } else { Some(inner) };
        Self {
            inner,
            remaining: limit,
        }
    }

    /// True while the wrapped stream is still held
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl<S: Iterator> Iterator for Limited<S> {
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        let Some(item) = self.inner.as_mut()?.next() else {
            self.inner = None;
            return None;
        };

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.inner = None;
            }
        }
        Some(item)
    }
}
