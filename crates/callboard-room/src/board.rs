//! Boards and line evaluation.
//!
//! A board is a permutation of 1..=25 laid out row-major on a 5×5 grid.
//! Nothing about a board changes during a game: which cells are marked is
//! always recomputed from the room's called numbers, so a board can never
//! drift out of sync with the calls.

use callboard_protocol::{BOARD_CELLS, ParticipantId};
use rand::Rng;
use rand::seq::SliceRandom;

/// Highest callable number.
pub const MAX_NUMBER: u8 = BOARD_CELLS as u8;

/// The 12 scoring lines as cell indices: 5 rows, 5 columns, 2 diagonals.
pub const LINES: [[usize; 5]; 12] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

/// Set of called numbers, one bit per number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalledSet(u32);

impl CalledSet {
    pub fn from_numbers(numbers: &[u8]) -> Self {
        let mut set = Self::default();
        for &n in numbers {
            set.insert(n);
        }
        set
    }

    /// Adds `number`. Returns `false` if it was already present.
    pub fn insert(&mut self, number: u8) -> bool {
        if number >= 32 {
            return false;
        }
        let bit = 1u32 << number;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        fresh
    }

    pub fn contains(&self, number: u8) -> bool {
        number < 32 && self.0 & (1u32 << number) != 0
    }
}

/// `true` if `number` can appear on a board.
pub fn is_valid_number(number: u8) -> bool {
    (1..=MAX_NUMBER).contains(&number)
}

/// Counts the lines of `cells` whose five numbers have all been called.
pub fn count_lines(cells: &[u8; BOARD_CELLS], called: &CalledSet) -> u8 {
    LINES
        .iter()
        .filter(|line| line.iter().all(|&i| called.contains(cells[i])))
        .count() as u8
}

/// Index into `calls` of the call after which `cells` first had a complete
/// line, or `None` if it never did.
pub fn first_line_at(cells: &[u8; BOARD_CELLS], calls: &[u8]) -> Option<usize> {
    let mut called = CalledSet::default();
    calls.iter().position(|&n| {
        called.insert(n);
        count_lines(cells, &called) > 0
    })
}

/// One participant's board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    owner: ParticipantId,
    cells: [u8; BOARD_CELLS],
}

impl Board {
    /// Deals a uniformly shuffled board.
    pub fn shuffled(owner: ParticipantId, rng: &mut impl Rng) -> Self {
        let mut cells: [u8; BOARD_CELLS] = std::array::from_fn(|i| i as u8 + 1);
        cells.shuffle(rng);
        Self { owner, cells }
    }

    /// Builds a board from an explicit layout. Returns `None` unless
    /// `cells` holds each of 1..=25 exactly once.
    pub fn from_cells(owner: ParticipantId, cells: [u8; BOARD_CELLS]) -> Option<Self> {
        let mut seen = CalledSet::default();
        let bijective = cells.iter().all(|&n| is_valid_number(n) && seen.insert(n));
        bijective.then_some(Self { owner, cells })
    }

    pub fn owner(&self) -> ParticipantId {
        self.owner
    }

    pub fn cells(&self) -> &[u8; BOARD_CELLS] {
        &self.cells
    }

    /// Bitmask of marked cell positions (bit `i` = cell `i`).
    pub fn marked_mask(&self, called: &CalledSet) -> u32 {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, n)| called.contains(**n))
            .fold(0, |mask, (i, _)| mask | (1u32 << i))
    }

    pub fn lines(&self, called: &CalledSet) -> u8 {
        count_lines(&self.cells, called)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn identity() -> [u8; BOARD_CELLS] {
        std::array::from_fn(|i| i as u8 + 1)
    }

    #[test]
    fn test_shuffled_board_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let board = Board::shuffled(ParticipantId(1), &mut rng);
            assert!(Board::from_cells(ParticipantId(1), *board.cells()).is_some());
        }
    }

    #[test]
    fn test_shuffles_differ_between_draws() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Board::shuffled(ParticipantId(1), &mut rng);
        let b = Board::shuffled(ParticipantId(2), &mut rng);
        assert_ne!(a.cells(), b.cells());
    }

    #[test]
    fn test_from_cells_rejects_non_permutations() {
        let mut dup = identity();
        dup[3] = 1;
        assert!(Board::from_cells(ParticipantId(1), dup).is_none());

        let mut zero = identity();
        zero[0] = 0;
        assert!(Board::from_cells(ParticipantId(1), zero).is_none());

        let mut big = identity();
        big[24] = 26;
        assert!(Board::from_cells(ParticipantId(1), big).is_none());
    }

    #[test]
    fn test_fully_called_board_has_all_twelve_lines() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = Board::shuffled(ParticipantId(1), &mut rng);

        let mut order: Vec<u8> = (1..=MAX_NUMBER).collect();
        order.shuffle(&mut rng);
        let called = CalledSet::from_numbers(&order);

        assert_eq!(board.lines(&called), 12);
    }

    #[test]
    fn test_each_line_counts_once() {
        let cells = identity();
        for line in LINES {
            let numbers: Vec<u8> = line.iter().map(|&i| cells[i]).collect();
            assert_eq!(count_lines(&cells, &CalledSet::from_numbers(&numbers)), 1);
        }
    }

    #[test]
    fn test_four_of_five_is_not_a_line() {
        let called = CalledSet::from_numbers(&[1, 2, 3, 4, 10, 15, 20]);
        assert_eq!(count_lines(&identity(), &called), 0);
    }

    #[test]
    fn test_row_and_column_sharing_a_cell_count_twice() {
        // Row 0 and column 0 share cell 0 (number 1).
        let called = CalledSet::from_numbers(&[1, 2, 3, 4, 5, 6, 11, 16, 21]);
        assert_eq!(count_lines(&identity(), &called), 2);
    }

    #[test]
    fn test_first_line_at_finds_the_completing_call() {
        let calls = [9, 1, 2, 3, 4, 5, 6];
        assert_eq!(first_line_at(&identity(), &calls), Some(5));
        assert_eq!(first_line_at(&identity(), &calls[..5]), None);
    }

    #[test]
    fn test_marked_mask_tracks_positions_not_numbers() {
        let mut cells = identity();
        cells.swap(0, 24); // 25 sits in cell 0, 1 in cell 24
        let board = Board::from_cells(ParticipantId(1), cells).unwrap();
        let mask = board.marked_mask(&CalledSet::from_numbers(&[25]));
        assert_eq!(mask, 1);
    }

    #[test]
    fn test_called_set_basics() {
        let mut set = CalledSet::default();
        assert!(!set.contains(7));
        assert!(set.insert(7));
        assert!(!set.insert(7));
        assert!(set.contains(7));
        assert!(!set.contains(8));
        assert!(!set.insert(40));
        assert_eq!(set, CalledSet::from_numbers(&[7]));
    }

    #[test]
    fn test_valid_number_range() {
        assert!(!is_valid_number(0));
        assert!(is_valid_number(1));
        assert!(is_valid_number(25));
        assert!(!is_valid_number(26));
    }
}
