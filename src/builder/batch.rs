//! Fixed-size batching of package lists.

/// Batch size used when zero is requested.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Split `items` into consecutive batches of at most `batch_size` elements.
///
/// Order is preserved and the last batch holds the remainder. A size of
/// zero means [`DEFAULT_BATCH_SIZE`].
pub fn split_into_batches<T>(items: &[T], batch_size: usize) -> Vec<&[T]> {
    let size = if batch_size == 0 {
        DEFAULT_BATCH_SIZE
    } else {
        batch_size
    };
    items.chunks(size).collect()
}
