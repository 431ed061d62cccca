//! Format and tuning constants, centralized so interdependent values stay
//! in one place. See [`constants`] for the dependency graph.

mod constants;

pub use constants::{
    GROWTH_FACTOR, INITIAL_PAGES, INTERIOR_HEADER_SIZE, INTERIOR_MAX_KEYS, INVALID_PAGE, KEY_SIZE,
    LEAF_ENTRY_SIZE, LEAF_HEADER_SIZE, LEAF_KEYS_OFFSET, LEAF_MAX_KEYS, LEAF_VALUES_OFFSET,
    META_MAGIC, PAGE_SIZE, VALUE_SIZE,
};
