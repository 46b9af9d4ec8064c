//! Canonical train ordering.
//!
//! Release trains are ranked by their position in this table. Train labels
//! are never compared as strings or numbers: switch images moved to a
//! separate two-digit numbering epoch, so the label alone says nothing about
//! age.

/// Known trains, oldest first.
pub const TRAIN_ORDER: &[&str] = &[
    // Controller numbering epoch
    "1", "2", "3", "4", "5", "6",
    // Switch numbering epoch
    "11", "12", "13", "14", "15", "16",
];

/// Position of `train` in the canonical order, if it is a known train.
pub fn train_index(train: &str) -> Option<usize> {
    TRAIN_ORDER.iter().position(|t| *t == train)
}

/// Train label stored at `index`.
pub fn train_label(index: usize) -> Option<&'static str> {
    TRAIN_ORDER.get(index).copied()
}
