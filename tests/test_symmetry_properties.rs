//! Property-based tests for symmetry-invariant board keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use proptest::prelude::*;

use bulk::{CanonicalBoardKey, Location, Symmetry};

/// Strategy: a board of up to 6x6 with cell values 0-9 and a mine count.
fn board_strategy() -> impl Strategy<Value = (usize, usize, usize, Vec<u8>)> {
    (1..=6usize, 1..=6usize, 0..20usize).prop_flat_map(|(width, height, mines)| {
        prop::collection::vec(0..=9u8, width * height).prop_map(move |cells| (width, height, mines, cells))
    })
}

fn pick(width: usize, height: usize, index: usize) -> Symmetry {
    let group: Vec<Symmetry> = Symmetry::group(width, height).collect();
    group[index % group.len()]
}

fn hash_of(key: &CanonicalBoardKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    // 1. Every symmetric image of a board is equal to it and hashes the same
    #[test]
    fn transformed_boards_are_equal((width, height, mines, cells) in board_strategy(), index in 0..8usize) {
        let key = CanonicalBoardKey::from_grid(width, height, mines, cells);
        let image = key.transformed(pick(width, height, index));
        prop_assert_eq!(&key, &image);
        prop_assert_eq!(hash_of(&key), hash_of(&image));
    }

    // 2. The recovered symmetry satisfies self[p] == other[g(p)] for every cell
    #[test]
    fn recovered_symmetry_maps_cells((width, height, mines, cells) in board_strategy(), index in 0..8usize) {
        let key = CanonicalBoardKey::from_grid(width, height, mines, cells);
        let image = key.transformed(pick(width, height, index));
        let symmetry = key.symmetry_to(&image).unwrap();
        for y in 0..height {
            for x in 0..width {
                let p = Location::new(x, y);
                prop_assert_eq!(key.cell(p), image.cell(symmetry.apply(p, width, height)));
            }
        }
    }

    // 3. Mapping into the canonical frame and back is the identity
    #[test]
    fn location_round_trip(
        (width, height, mines, cells) in board_strategy(),
        index in 0..8usize,
        x in 0..6usize,
        y in 0..6usize,
    ) {
        let key = CanonicalBoardKey::from_grid(width, height, mines, cells);
        let image = key.transformed(pick(width, height, index));
        let observed = Location::new(x % width, y % height);
        let canonical = key.map_to_canonical(&image, observed).unwrap();
        prop_assert!(canonical.x < width && canonical.y < height);
        prop_assert_eq!(key.map_from_canonical(&image, canonical).unwrap(), observed);
    }

    // 4. The chosen cell keeps its value when mapped into the canonical frame
    #[test]
    fn mapped_location_keeps_cell_value(
        (width, height, mines, cells) in board_strategy(),
        index in 0..8usize,
        x in 0..6usize,
        y in 0..6usize,
    ) {
        let key = CanonicalBoardKey::from_grid(width, height, mines, cells);
        let image = key.transformed(pick(width, height, index));
        let observed = Location::new(x % width, y % height);
        let canonical = key.map_to_canonical(&image, observed).unwrap();
        prop_assert_eq!(key.cell(canonical), image.cell(observed));
    }

    // 5. Boards with different mine counts are never equal
    #[test]
    fn mine_count_separates_keys((width, height, mines, cells) in board_strategy()) {
        let a = CanonicalBoardKey::from_grid(width, height, mines, cells.clone());
        let b = CanonicalBoardKey::from_grid(width, height, mines + 1, cells);
        prop_assert_ne!(a, b);
    }

    // 6. Equality is symmetric
    #[test]
    fn equality_is_symmetric(
        (width, height, mines, cells) in board_strategy(),
        other in prop::collection::vec(0..=9u8, 36),
    ) {
        let a = CanonicalBoardKey::from_grid(width, height, mines, cells);
        let b = CanonicalBoardKey::from_grid(width, height, mines, other[..width * height].to_vec());
        prop_assert_eq!(a == b, b == a);
    }
}
