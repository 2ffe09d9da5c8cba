//! Chunk-size arithmetic for store statements

/// Upper bound on records per upsert statement
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 1000;

/// How many items fit in one statement when each binds `per_item` parameters
///
/// Never returns zero, so callers always make progress.
pub fn per_statement(max_params: usize, per_item: usize) -> usize {
    (max_params / per_item.max(1)).max(1)
}

/// Records per upsert statement for a record type with `field_count` columns
pub fn upsert_batch_size(max_params: usize, field_count: usize) -> usize {
    per_statement(max_params, field_count).min(DEFAULT_UPSERT_BATCH_SIZE)
}
