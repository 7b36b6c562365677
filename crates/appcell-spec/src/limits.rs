//! Two-slot override table for scalar limits.
//!
//! Packages record values into the slot of their type; within a slot the
//! last recording wins. Resolution happens once, after every package has
//! been seen: the application slot beats the runtime slot regardless of
//! the order the packages were processed in.

use appcell_common::types::PackageType;

/// One value slot per package type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideTable<T> {
    runtime: Option<T>,
    application: Option<T>,
}

impl<T> Default for OverrideTable<T> {
    fn default() -> Self {
        Self {
            runtime: None,
            application: None,
        }
    }
}

impl<T: Copy> OverrideTable<T> {
    /// Records `value` in the slot for `package_type`.
    pub fn record(&mut self, package_type: PackageType, value: T) {
        match package_type {
            PackageType::Runtime => self.runtime = Some(value),
            PackageType::Application => self.application = Some(value),
        }
    }

    /// The winning value, if any package recorded one.
    #[must_use]
    pub fn resolve(&self) -> Option<T> {
        self.application.or(self.runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_resolves_to_none() {
        assert_eq!(OverrideTable::<u64>::default().resolve(), None);
    }

    #[test]
    fn application_beats_runtime_in_any_order() {
        let mut table = OverrideTable::default();
        table.record(PackageType::Application, 256);
        table.record(PackageType::Runtime, 1024);
        assert_eq!(table.resolve(), Some(256));
    }

    #[test]
    fn last_recording_wins_within_a_slot() {
        let mut table = OverrideTable::default();
        table.record(PackageType::Runtime, 1);
        table.record(PackageType::Runtime, 2);
        assert_eq!(table.resolve(), Some(2));
    }
}
