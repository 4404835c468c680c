//! Read model trait for query-side views.

/// A read model that can report its size without awaiting.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries, or 0 while a writer holds the model.
    fn count(&self) -> usize;
}
