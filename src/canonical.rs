//! # State Canonicalizer
//!
//! Groups board snapshots into equivalence classes under the board's symmetry
//! group, so that "the same position seen in a mirror" is aggregated once.
//!
//! ## Symmetry group
//! A [`Symmetry`] is an index in `0..8` whose bits select the transform:
//! - bit `1`: flip columns (`x -> width - 1 - x`)
//! - bit `2`: flip rows (`y -> height - 1 - y`)
//! - bit `4`: transpose (swap `x` and `y`), only for square boards
//!
//! Rectangular boards use the 4-element group generated by the flips; square
//! boards use all 8 elements (the dihedral group of the square).
//!
//! ## Equality and hashing
//! Two keys are equal iff they have the same dimensions and mine count and some
//! group element maps one grid onto the other. The hash is computed once at
//! construction by hashing the grid as read through every group element and
//! combining those with an order-independent sum, which makes it invariant
//! under the group.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::CanonicalError;
use crate::simulation::{GameSettings, Location, Simulation};

/// Cell value for anything that is not a revealed count (hidden, flag, mine).
pub const UNKNOWN: u8 = 9;

/// One element of a board's symmetry group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symmetry(u8);

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry(0);

    const FLIP_COL: u8 = 1;
    const FLIP_ROW: u8 = 2;
    const TRANSPOSE: u8 = 4;

    /// Builds a group element from its index. Returns `None` above 7.
    pub fn from_index(index: u8) -> Option<Self> {
        (index < 8).then_some(Symmetry(index))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    pub fn transposes(&self) -> bool {
        self.0 & Self::TRANSPOSE != 0
    }

    pub fn flips_rows(&self) -> bool {
        self.0 & Self::FLIP_ROW != 0
    }

    pub fn flips_cols(&self) -> bool {
        self.0 & Self::FLIP_COL != 0
    }

    /// Size of the symmetry group for a board of the given shape.
    pub fn group_order(width: usize, height: usize) -> u8 {
        if width == height {
            8
        } else {
            4
        }
    }

    /// All group elements applicable to a board of the given shape.
    pub fn group(width: usize, height: usize) -> impl Iterator<Item = Symmetry> {
        (0..Self::group_order(width, height)).map(Symmetry)
    }

    /// Maps a location: flips first, then the optional transpose.
    pub fn apply(&self, location: Location, width: usize, height: usize) -> Location {
        let mut x = location.x;
        let mut y = location.y;
        if self.flips_cols() {
            x = width - 1 - x;
        }
        if self.flips_rows() {
            y = height - 1 - y;
        }
        if self.transposes() {
            std::mem::swap(&mut x, &mut y);
        }
        Location::new(x, y)
    }

    /// Inverse of [`Symmetry::apply`]: undo the transpose, then the flips.
    pub fn invert(&self, location: Location, width: usize, height: usize) -> Location {
        let mut x = location.x;
        let mut y = location.y;
        if self.transposes() {
            std::mem::swap(&mut x, &mut y);
        }
        if self.flips_rows() {
            y = height - 1 - y;
        }
        if self.flips_cols() {
            x = width - 1 - x;
        }
        Location::new(x, y)
    }
}

/// A board snapshot compared up to symmetry.
///
/// Immutable once built; the hash is cached at construction.
#[derive(Debug, Clone)]
pub struct CanonicalBoardKey {
    width: usize,
    height: usize,
    mines: usize,
    /// Row-major: `cells[y * width + x]`.
    cells: Vec<u8>,
    hash: u64,
}

impl CanonicalBoardKey {
    /// Builds a key from a row-major grid. Values above 8 become [`UNKNOWN`].
    ///
    /// # Panics
    /// Panics if `cells.len() != width * height`.
    pub fn from_grid(width: usize, height: usize, mines: usize, mut cells: Vec<u8>) -> Self {
        assert_eq!(cells.len(), width * height, "grid size does not match dimensions");
        for cell in cells.iter_mut() {
            if *cell > 8 {
                *cell = UNKNOWN;
            }
        }
        let hash = Self::symmetric_hash(width, height, mines, &cells);
        CanonicalBoardKey { width, height, mines, cells, hash }
    }

    /// Snapshots what a player can currently see on a live simulation.
    pub fn from_simulation<G: Simulation + ?Sized>(game: &G) -> Self {
        let width = game.width();
        let height = game.height();
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let value = game.query(Location::new(x, y));
                cells.push(if (0..=8).contains(&value) { value as u8 } else { UNKNOWN });
            }
        }
        Self::from_grid(width, height, game.mines(), cells)
    }

    /// Builds a key from a sparse list of revealed `(x, y, value)` cells; every
    /// other cell is unknown. Fails on the first cell outside the board.
    pub fn from_cells(settings: &GameSettings, revealed: &[(usize, usize, u8)]) -> Result<Self, CanonicalError> {
        let GameSettings { width, height, mines } = *settings;
        let mut cells = vec![UNKNOWN; width * height];
        for &(x, y, value) in revealed {
            if x >= width || y >= height {
                return Err(CanonicalError::OffBoard { x, y, width, height });
            }
            cells[y * width + x] = value;
        }
        Ok(Self::from_grid(width, height, mines, cells))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn cell(&self, location: Location) -> u8 {
        self.cells[location.y * self.width + location.x]
    }

    /// Returns the board obtained by moving every cell `p` to `symmetry(p)`.
    ///
    /// The result is always equal to `self`.
    pub fn transformed(&self, symmetry: Symmetry) -> Self {
        let mut cells = vec![UNKNOWN; self.cells.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let target = symmetry.apply(Location::new(x, y), self.width, self.height);
                cells[target.y * self.width + target.x] = self.cells[y * self.width + x];
            }
        }
        Self::from_grid(self.width, self.height, self.mines, cells)
    }

    /// The group element `g` such that `self[p] == other[g(p)]` for every cell.
    pub fn symmetry_to(&self, other: &CanonicalBoardKey) -> Result<Symmetry, CanonicalError> {
        if !self.same_shape(other) {
            return Err(CanonicalError::NotEquivalent);
        }
        Symmetry::group(self.width, self.height)
            .find(|&symmetry| self.matches(other, symmetry))
            .ok_or(CanonicalError::NotEquivalent)
    }

    /// Maps a location observed on `other` into this key's frame.
    pub fn map_to_canonical(
        &self,
        other: &CanonicalBoardKey,
        location: Location,
    ) -> Result<Location, CanonicalError> {
        let symmetry = self.symmetry_to(other)?;
        Ok(symmetry.invert(location, self.width, self.height))
    }

    /// Maps a location expressed in this key's frame onto `other`.
    pub fn map_from_canonical(
        &self,
        other: &CanonicalBoardKey,
        location: Location,
    ) -> Result<Location, CanonicalError> {
        let symmetry = self.symmetry_to(other)?;
        Ok(symmetry.apply(location, self.width, self.height))
    }

    fn same_shape(&self, other: &CanonicalBoardKey) -> bool {
        self.width == other.width && self.height == other.height && self.mines == other.mines
    }

    fn matches(&self, other: &CanonicalBoardKey, symmetry: Symmetry) -> bool {
        (0..self.height).all(|y| {
            (0..self.width).all(|x| {
                let target = symmetry.apply(Location::new(x, y), self.width, self.height);
                self.cells[y * self.width + x] == other.cells[target.y * self.width + target.x]
            })
        })
    }

    fn symmetric_hash(width: usize, height: usize, mines: usize, cells: &[u8]) -> u64 {
        let mut combined = 0u64;
        for symmetry in Symmetry::group(width, height) {
            let mut h = 0u64;
            for y in 0..height {
                for x in 0..width {
                    let source = symmetry.apply(Location::new(x, y), width, height);
                    h = h.wrapping_mul(31).wrapping_add(cells[source.y * width + source.x] as u64);
                }
            }
            // Finalizer spreads the bits before the order-independent sum.
            h ^= h >> 33;
            h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
            h ^= h >> 33;
            combined = combined.wrapping_add(h);
        }
        combined ^ ((width as u64) << 48) ^ ((height as u64) << 32) ^ mines as u64
    }
}

impl PartialEq for CanonicalBoardKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.same_shape(other)
            && Symmetry::group(self.width, self.height).any(|s| self.matches(other, s))
    }
}

impl Eq for CanonicalBoardKey {}

impl Hash for CanonicalBoardKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for CanonicalBoardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "```")?;
        for row in self.cells.chunks(self.width) {
            for value in row {
                write!(f, "{}", value)?;
            }
            writeln!(f)?;
        }
        write!(f, "```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn corner_one(settings: &GameSettings) -> CanonicalBoardKey {
        CanonicalBoardKey::from_cells(settings, &[(0, 0, 1)]).unwrap()
    }

    #[test]
    fn test_group_order_depends_on_shape() {
        assert_eq!(Symmetry::group(8, 8).count(), 8);
        assert_eq!(Symmetry::group(30, 16).count(), 4);
    }

    #[test]
    fn test_mirrored_corners_are_equal() {
        let settings = GameSettings::EXPERT;
        let a = CanonicalBoardKey::from_cells(&settings, &[(0, 0, 2)]).unwrap();
        let b = CanonicalBoardKey::from_cells(&settings, &[(29, 15, 2)]).unwrap();
        let c = CanonicalBoardKey::from_cells(&settings, &[(29, 0, 2)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_transpose_only_on_square_boards() {
        let square = GameSettings::new(5, 5, 3);
        let a = CanonicalBoardKey::from_cells(&square, &[(1, 0, 3)]).unwrap();
        let b = CanonicalBoardKey::from_cells(&square, &[(0, 1, 3)]).unwrap();
        assert_eq!(a, b);

        let wide = GameSettings::new(6, 5, 3);
        let a = CanonicalBoardKey::from_cells(&wide, &[(1, 0, 3)]).unwrap();
        let b = CanonicalBoardKey::from_cells(&wide, &[(0, 1, 3)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_mine_counts_differ() {
        let a = CanonicalBoardKey::from_cells(&GameSettings::new(9, 9, 10), &[(0, 0, 1)]).unwrap();
        let b = CanonicalBoardKey::from_cells(&GameSettings::new(9, 9, 11), &[(0, 0, 1)]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.symmetry_to(&b), Err(CanonicalError::NotEquivalent));
    }

    #[test]
    fn test_off_board_cells_are_rejected() {
        let settings = GameSettings::BEGINNER;
        assert_eq!(
            CanonicalBoardKey::from_cells(&settings, &[(9, 0, 1)]),
            Err(CanonicalError::OffBoard { x: 9, y: 0, width: 9, height: 9 })
        );
        assert!(CanonicalBoardKey::from_cells(&settings, &[(0, 9, 1)]).is_err());
        assert!(CanonicalBoardKey::from_cells(&settings, &[(8, 8, 1)]).is_ok());
    }

    #[test]
    fn test_out_of_range_values_fold_to_unknown() {
        let a = CanonicalBoardKey::from_grid(2, 1, 0, vec![12, 1]);
        let b = CanonicalBoardKey::from_grid(2, 1, 0, vec![UNKNOWN, 1]);
        assert_eq!(a, b);
        assert_eq!(a.cell(Location::new(0, 0)), UNKNOWN);
    }

    #[test]
    fn test_hash_map_groups_orientations() {
        let settings = GameSettings::BEGINNER;
        let mut counts: HashMap<CanonicalBoardKey, u32> = HashMap::new();
        for corner in settings.corners() {
            let key = CanonicalBoardKey::from_cells(&settings, &[(corner.x, corner.y, 1)]).unwrap();
            *counts.entry(key).or_default() += 1;
        }
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&corner_one(&settings)), Some(&4));
    }

    #[test]
    fn test_map_to_canonical_moves_observed_click() {
        let settings = GameSettings::EXPERT;
        let canonical = corner_one(&settings);
        // Same shape seen from the bottom-right corner.
        let observed = CanonicalBoardKey::from_cells(&settings, &[(29, 15, 1)]).unwrap();
        let mapped = canonical.map_to_canonical(&observed, Location::new(28, 14)).unwrap();
        assert_eq!(mapped, Location::new(1, 1));
        let back = canonical.map_from_canonical(&observed, mapped).unwrap();
        assert_eq!(back, Location::new(28, 14));
    }

    #[test]
    fn test_display_renders_rows() {
        let key = CanonicalBoardKey::from_grid(3, 2, 1, vec![0, 1, 9, 9, 9, 2]);
        assert_eq!(key.to_string(), "```\n019\n992\n```");
    }
}
