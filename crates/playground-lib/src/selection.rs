//! NPU device selection

use std::collections::BTreeSet;

/// Ordered, duplicate-free set of device indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NpuSelection {
    devices: BTreeSet<u32>,
}

impl NpuSelection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Selection with a single device, the launch form default
    pub fn single(id: u32) -> Self {
        let mut selection = Self::empty();
        selection.devices.insert(id);
        selection
    }

    /// Flip membership; returns true when the device is now selected
    pub fn toggle(&mut self, id: u32) -> bool {
        if self.devices.remove(&id) {
            false
        } else {
            self.devices.insert(id);
            true
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.devices.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Ascending device list
    pub fn to_vec(&self) -> Vec<u32> {
        self.devices.iter().copied().collect()
    }

    pub fn join(&self, sep: &str) -> String {
        self.devices
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl FromIterator<u32> for NpuSelection {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_sequence() {
        let mut sel = NpuSelection::single(0);

        assert!(sel.toggle(2));
        assert_eq!(sel.to_vec(), vec![0, 2]);

        assert!(!sel.toggle(0));
        assert_eq!(sel.to_vec(), vec![2]);

        assert!(!sel.toggle(2));
        assert!(sel.to_vec().is_empty());
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let original: NpuSelection = [1, 4, 6].into_iter().collect();

        for id in 0..8 {
            let mut sel = original.clone();
            sel.toggle(id);
            sel.toggle(id);
            assert_eq!(sel, original);
            assert_eq!(sel.to_vec(), original.to_vec());
        }
    }

    #[test]
    fn test_always_strictly_ascending() {
        let mut sel = NpuSelection::empty();
        for id in [7, 3, 5, 3, 0, 15, 7, 9, 1] {
            sel.toggle(id);
            let devices = sel.to_vec();
            assert!(devices.windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(sel.to_vec(), vec![0, 1, 5, 9, 15]);
        assert_eq!(sel.join(","), "0,1,5,9,15");
    }
}
