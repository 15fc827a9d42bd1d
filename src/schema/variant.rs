//! Variant sets: named, mutually-exclusive authored configurations.
//!
//! Selection state is `Option<usize>`: `None` is the "unset/cleared"
//! sentinel. Lookups return `None` on miss rather than erroring, and
//! out-of-range selection input clears the selection - a deliberate
//! permissive policy so UI code can pass stale indices safely.

/// One variant set of a node, synchronized from the store.
#[derive(Clone, Debug)]
pub struct VariantSet {
    pub(crate) name: String,
    pub(crate) variants: Vec<String>,
    pub(crate) selection: Option<usize>,
}

impl VariantSet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_variants(&self) -> usize {
        self.variants.len()
    }

    pub fn variant_name(&self, ival: usize) -> Option<&str> {
        self.variants.get(ival).map(String::as_str)
    }

    /// Index of the current selection, `None` when unset.
    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn find_variant(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == name)
    }
}

/// Open authoring target of a variant edit scope.
#[derive(Clone, Debug)]
pub(crate) struct EditTarget {
    pub set: String,
    pub variant: String,
}
