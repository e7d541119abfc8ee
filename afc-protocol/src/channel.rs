//! Channel tables and channel selection.
//!
//! The 6GHz CFI identifiers granted by the portal are mapped onto 5GHz
//! channel numbers through a fixed association table.

use crate::types::Cfi;

/// Valid 2.4GHz channel numbers.
pub const VALID_2G_CHANNELS: [u8; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];

/// Valid 5GHz channel numbers.
pub const VALID_5G_CHANNELS: [u8; 25] = [
    36, 40, 44, 48, 52, 56, 60, 64, 100, 104, 108, 112, 116, 120, 124, 128, 132, 136, 140, 144,
    149, 153, 157, 161, 165,
];

/// 6GHz CFIs that have a 5GHz partner.
pub const CFI_6G: [Cfi; 25] = [
    1, 5, 9, 13, 17, 21, 25, 29, 33, 37, 41, 45, 49, 53, 57, 61, 65, 69, 73, 77, 81, 85, 89, 93,
    97,
];

/// 2.4GHz channel used when falling back to the legacy band.
pub const LEGACY_FALLBACK_CHANNEL: u8 = 1;

/// CFI to 5GHz channel association, ordered by CFI.
pub const CFI_TO_5G: [(Cfi, u8); 25] = [
    (1, 36),
    (5, 40),
    (9, 44),
    (13, 48),
    (17, 52),
    (21, 56),
    (25, 60),
    (29, 64),
    (33, 100),
    (37, 104),
    (41, 108),
    (45, 112),
    (49, 116),
    (53, 120),
    (57, 124),
    (61, 128),
    (65, 132),
    (69, 136),
    (73, 140),
    (77, 144),
    (81, 149),
    (85, 153),
    (89, 157),
    (93, 161),
    (97, 165),
];

/// Look up the 5GHz partner of a CFI.
///
/// Returns `None` if the CFI is not in the table.
pub fn map_to_band_channel(cfi: Cfi) -> Option<u8> {
    CFI_TO_5G
        .binary_search_by_key(&cfi, |&(c, _)| c)
        .ok()
        .map(|idx| CFI_TO_5G[idx].1)
}

/// Policy for picking one channel out of the available set.
pub trait SelectionPolicy: Send + Sync {
    /// Pick a channel from an ascending, duplicate-free set.
    fn select(&self, available: &[Cfi]) -> Option<Cfi>;
}

/// Lowest available identifier wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestChannel;

impl SelectionPolicy for LowestChannel {
    fn select(&self, available: &[Cfi]) -> Option<Cfi> {
        available.iter().copied().min()
    }
}

/// Prefers channels that can actually be mapped onto the 5GHz radio,
/// falling back to the lowest identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestMappable;

impl SelectionPolicy for LowestMappable {
    fn select(&self, available: &[Cfi]) -> Option<Cfi> {
        available
            .iter()
            .copied()
            .filter(|&cfi| map_to_band_channel(cfi).is_some())
            .min()
            .or_else(|| LowestChannel.select(available))
    }
}

/// Select the best channel with the default policy.
pub fn select_best(available: &[Cfi]) -> Option<Cfi> {
    LowestChannel.select(available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_channel_lists() {
        assert_eq!(CFI_TO_5G.len(), CFI_6G.len());
        assert_eq!(CFI_TO_5G.len(), VALID_5G_CHANNELS.len());

        for (i, &(cfi, ch)) in CFI_TO_5G.iter().enumerate() {
            assert_eq!(cfi, CFI_6G[i]);
            assert_eq!(ch, VALID_5G_CHANNELS[i]);
        }
    }

    #[test]
    fn test_table_sorted_by_cfi() {
        assert!(CFI_TO_5G.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_map_to_band_channel() {
        assert_eq!(map_to_band_channel(1), Some(36));
        assert_eq!(map_to_band_channel(33), Some(100));
        assert_eq!(map_to_band_channel(97), Some(165));

        assert_eq!(map_to_band_channel(0), None);
        assert_eq!(map_to_band_channel(3), None);
        assert_eq!(map_to_band_channel(101), None);
        assert_eq!(map_to_band_channel(233), None);
    }

    #[test]
    fn test_map_is_pure() {
        for cfi in 0..=240 {
            assert_eq!(map_to_band_channel(cfi), map_to_band_channel(cfi));
            let expected = CFI_TO_5G.iter().find(|&&(c, _)| c == cfi).map(|&(_, ch)| ch);
            assert_eq!(map_to_band_channel(cfi), expected);
        }
    }

    #[test]
    fn test_select_best() {
        assert_eq!(select_best(&[5, 1, 9]), Some(1));
        assert_eq!(select_best(&[42]), Some(42));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_lowest_mappable() {
        assert_eq!(LowestMappable.select(&[3, 7, 9]), Some(9));
        assert_eq!(LowestMappable.select(&[3, 7]), Some(3));
        assert_eq!(LowestMappable.select(&[]), None);
    }
}
