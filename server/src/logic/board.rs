use std::collections::{BTreeMap, BTreeSet, VecDeque};

use minesweeper_common::models::{BoardParams, BoardView, Cell, OpenedCell};
use rand::Rng;
use tracing::trace;

use crate::{
    config::BoardLimits,
    data::{Board, MINE_VALUE},
    error::{GameError, Result},
};

fn validate_params(params: &BoardParams, limits: &BoardLimits) -> Result<()> {
    let (rows, columns, mines) = (params.nbr_rows, params.nbr_columns, params.nbr_mines);

    if !(2..=limits.max_rows).contains(&rows) || !(2..=limits.max_columns).contains(&columns) {
        return Err(GameError::InvalidDimensions {
            rows,
            columns,
            max_rows: limits.max_rows,
            max_columns: limits.max_columns,
        });
    }

    let cells = rows * columns;
    let ceiling = limits.max_mines.max(cells - 1);
    // At least one cell has to stay safe, whatever the configured ceiling.
    if mines == 0 || mines > ceiling || mines >= cells {
        return Err(GameError::InvalidMineCount {
            mines,
            max: ceiling.min(cells - 1),
        });
    }

    Ok(())
}

impl Board {
    /// Creates a board with `nbr_mines` distinct mines drawn from `rng`.
    pub fn generate<R: Rng>(
        params: &BoardParams,
        limits: &BoardLimits,
        rng: &mut R,
    ) -> Result<Self> {
        validate_params(params, limits)?;

        let mut mines = BTreeSet::new();
        while mines.len() < params.nbr_mines {
            let cell = Cell::new(
                rng.random_range(0..params.nbr_rows),
                rng.random_range(0..params.nbr_columns),
            );
            if !mines.insert(cell) {
                trace!("Mine already placed at {}, drawing again", cell);
            }
        }

        Ok(Self::assemble(params, mines))
    }

    /// Creates a board with a fixed mine layout.
    pub fn with_mines(
        params: &BoardParams,
        limits: &BoardLimits,
        mines: impl IntoIterator<Item = Cell>,
    ) -> Result<Self> {
        validate_params(params, limits)?;

        let mut layout = BTreeSet::new();
        for cell in mines {
            if cell.row >= params.nbr_rows || cell.column >= params.nbr_columns {
                return Err(GameError::out_of_bounds(cell));
            }
            layout.insert(cell);
        }

        if layout.len() != params.nbr_mines {
            return Err(GameError::InvalidMineCount {
                mines: layout.len(),
                max: params.nbr_mines,
            });
        }

        Ok(Self::assemble(params, layout))
    }

    fn assemble(params: &BoardParams, mines: BTreeSet<Cell>) -> Self {
        Self {
            rows: params.nbr_rows,
            columns: params.nbr_columns,
            mine_count: params.nbr_mines,
            mines,
            flagged: BTreeSet::new(),
            opened: BTreeMap::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.columns
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn flagged(&self) -> &BTreeSet<Cell> {
        &self.flagged
    }

    pub fn opened(&self) -> &BTreeMap<Cell, i8> {
        &self.opened
    }

    pub fn is_cell(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.column < self.columns
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    pub fn is_flagged(&self, cell: Cell) -> bool {
        self.flagged.contains(&cell)
    }

    pub fn is_opened(&self, cell: Cell) -> bool {
        self.opened.contains_key(&cell)
    }

    /// In-bounds cells around `cell`, diagonals included, `cell` excluded.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        let last_row = cell.row.saturating_add(1).min(self.rows - 1);
        let last_column = cell.column.saturating_add(1).min(self.columns - 1);

        (cell.row.saturating_sub(1)..=last_row)
            .flat_map(move |row| {
                (cell.column.saturating_sub(1)..=last_column)
                    .map(move |column| Cell::new(row, column))
            })
            .filter(move |neighbor| *neighbor != cell)
    }

    /// Number of mines around `cell`, or [`MINE_VALUE`] for a mine.
    pub fn value(&self, cell: Cell) -> i8 {
        if self.is_mine(cell) {
            return MINE_VALUE;
        }
        // At most eight neighbours.
        self.neighbors(cell).filter(|n| self.is_mine(*n)).count() as i8
    }

    /// Flags or unflags `cell`. Opened cells are left untouched.
    ///
    /// Returns whether the cell ends up flagged.
    pub fn toggle_flag(&mut self, cell: Cell) -> bool {
        if self.flagged.remove(&cell) {
            false
        } else if !self.is_opened(cell) {
            self.flagged.insert(cell)
        } else {
            false
        }
    }

    /// Opens `cell` and, when it has no mine around it, the whole empty
    /// region it belongs to plus that region's numbered border.
    ///
    /// Returns `false` without touching the board if the cell is flagged or
    /// already opened.
    pub fn reveal(&mut self, cell: Cell) -> bool {
        if self.is_flagged(cell) || self.is_opened(cell) {
            return false;
        }

        let value = self.value(cell);
        self.opened.insert(cell, value);
        if value != 0 {
            return true;
        }

        let mut frontier: VecDeque<Cell> = self.neighbors(cell).collect();
        while let Some(next) = frontier.pop_front() {
            if self.is_opened(next) || self.is_flagged(next) || self.is_mine(next) {
                continue;
            }

            let value = self.value(next);
            self.opened.insert(next, value);
            if value == 0 {
                frontier.extend(self.neighbors(next).filter(|n| !self.is_opened(*n)));
            }
        }

        trace!("Revealing {} opened {} cells in total", cell, self.opened.len());
        true
    }

    /// True once every safe cell is open.
    pub fn has_won(&self) -> bool {
        let safe_opened = self.opened.values().filter(|v| **v != MINE_VALUE).count();
        safe_opened + self.mine_count == self.cell_count()
    }

    pub fn has_lost(&self) -> bool {
        self.mines.iter().any(|mine| self.opened.contains_key(mine))
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            nbr_rows: self.rows,
            nbr_columns: self.columns,
            nbr_mines: self.mine_count,
            mines: self.mines.iter().copied().collect(),
            flagged: self.flagged.iter().copied().collect(),
            opened: self
                .opened
                .iter()
                .map(|(cell, value)| OpenedCell {
                    row: cell.row,
                    column: cell.column,
                    value: *value,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn params(rows: usize, columns: usize, mines: usize) -> BoardParams {
        BoardParams {
            nbr_rows: rows,
            nbr_columns: columns,
            nbr_mines: mines,
        }
    }

    fn board(rows: usize, columns: usize, mines: &[(usize, usize)]) -> Board {
        Board::with_mines(
            &params(rows, columns, mines.len()),
            &BoardLimits::default(),
            mines.iter().map(|&(r, c)| Cell::new(r, c)),
        )
        .unwrap()
    }

    #[test]
    fn generated_boards_have_exact_mine_count_in_bounds() {
        let limits = BoardLimits::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::generate(&params(6, 9, 20), &limits, &mut rng).unwrap();
            assert_eq!(board.mines().len(), 20);
            assert!(board.mines().iter().all(|m| board.is_cell(*m)));
        }
    }

    #[test]
    fn nearly_full_board_still_generates() {
        let mut rng = StdRng::seed_from_u64(7);
        let board = Board::generate(&params(2, 2, 3), &BoardLimits::default(), &mut rng).unwrap();
        assert_eq!(board.mines().len(), 3);
    }

    #[test]
    fn same_seed_same_layout() {
        let limits = BoardLimits::default();
        let a = Board::generate(&params(8, 8, 10), &limits, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Board::generate(&params(8, 8, 10), &limits, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.mines(), b.mines());
    }

    #[test]
    fn rejects_bad_dimensions() {
        let limits = BoardLimits {
            max_rows: 10,
            max_columns: 12,
            max_mines: 20,
        };
        let mut rng = StdRng::seed_from_u64(0);
        for (rows, columns) in [(1, 5), (5, 1), (11, 5), (5, 13)] {
            let err = Board::generate(&params(rows, columns, 1), &limits, &mut rng).unwrap_err();
            assert!(matches!(err, GameError::InvalidDimensions { .. }), "{rows}x{columns}");
        }
    }

    #[test]
    fn rejects_bad_mine_counts() {
        let limits = BoardLimits::default();
        let mut rng = StdRng::seed_from_u64(0);
        for mines in [0, 4, 5, 200] {
            let err = Board::generate(&params(2, 2, mines), &limits, &mut rng).unwrap_err();
            assert!(matches!(err, GameError::InvalidMineCount { .. }), "{mines} mines");
        }
    }

    #[test]
    fn configured_ceiling_does_not_cap_below_cell_count() {
        let limits = BoardLimits {
            max_rows: 20,
            max_columns: 20,
            max_mines: 5,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let board = Board::generate(&params(4, 4, 15), &limits, &mut rng).unwrap();
        assert_eq!(board.mine_count(), 15);
    }

    #[test]
    fn explicit_mines_are_validated() {
        let limits = BoardLimits::default();
        let err = Board::with_mines(&params(3, 3, 1), &limits, [Cell::new(3, 0)]).unwrap_err();
        assert_eq!(err, GameError::CellOutOfBounds { row: 3, column: 0 });

        let err = Board::with_mines(&params(3, 3, 2), &limits, [Cell::new(0, 0), Cell::new(0, 0)])
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidMineCount { mines: 1, .. }));
    }

    #[test]
    fn corner_edge_and_inner_neighbors() {
        let board = board(4, 5, &[(0, 0)]);
        assert_eq!(board.neighbors(Cell::new(0, 0)).count(), 3);
        assert_eq!(board.neighbors(Cell::new(0, 2)).count(), 5);
        assert_eq!(board.neighbors(Cell::new(3, 4)).count(), 3);
        assert_eq!(board.neighbors(Cell::new(2, 2)).count(), 8);
    }

    #[test]
    fn neighbors_are_irreflexive_bounded_and_symmetric() {
        let board = board(4, 5, &[(1, 1)]);
        let cells: Vec<Cell> = (0..4)
            .flat_map(|r| (0..5).map(move |c| Cell::new(r, c)))
            .collect();

        for &c in &cells {
            let around: Vec<Cell> = board.neighbors(c).collect();
            assert!(!around.contains(&c));
            assert!(around.iter().all(|n| board.is_cell(*n)));
            let unique: BTreeSet<Cell> = around.iter().copied().collect();
            assert_eq!(unique.len(), around.len());

            for &d in &cells {
                assert_eq!(
                    board.neighbors(d).any(|n| n == c),
                    around.contains(&d),
                    "{c} / {d}"
                );
            }
        }
    }

    #[test]
    fn values_count_adjacent_mines() {
        let board = board(3, 3, &[(0, 0), (2, 2)]);
        assert_eq!(board.value(Cell::new(0, 0)), MINE_VALUE);
        assert_eq!(board.value(Cell::new(1, 1)), 2);
        assert_eq!(board.value(Cell::new(0, 2)), 0);
        assert_eq!(board.value(Cell::new(0, 1)), 1);
    }

    #[test]
    fn multi_digit_coordinates_are_distinct() {
        let mut board = board(12, 12, &[(11, 11)]);
        board.toggle_flag(Cell::new(1, 10));
        assert!(board.is_flagged(Cell::new(1, 10)));
        assert!(!board.is_flagged(Cell::new(1, 1)));
        assert!(!board.is_flagged(Cell::new(10, 1)));
    }

    #[test]
    fn toggle_flag_cycles_and_skips_opened_cells() {
        let mut board = board(3, 3, &[(0, 0)]);
        let cell = Cell::new(2, 2);
        assert!(board.toggle_flag(cell));
        assert!(board.is_flagged(cell));
        assert!(!board.toggle_flag(cell));
        assert!(!board.is_flagged(cell));

        let numbered = Cell::new(1, 1);
        assert!(board.reveal(numbered));
        assert!(!board.toggle_flag(numbered));
        assert!(!board.is_flagged(numbered));
    }

    #[test]
    fn numbered_cell_does_not_flood() {
        let mut board = board(2, 2, &[(0, 0)]);
        assert!(board.reveal(Cell::new(1, 1)));
        assert_eq!(board.opened().len(), 1);
        assert_eq!(board.opened()[&Cell::new(1, 1)], 1);
    }

    #[test]
    fn empty_cell_floods_region_and_border() {
        let mut board = board(5, 5, &[(4, 4)]);
        assert!(board.reveal(Cell::new(0, 0)));
        assert_eq!(board.opened().len(), 24);
        assert!(!board.is_opened(Cell::new(4, 4)));
        assert!(board.has_won());
        assert!(!board.has_lost());
    }

    #[test]
    fn flood_skips_flagged_cells() {
        let mut board = board(5, 5, &[(4, 4)]);
        board.toggle_flag(Cell::new(0, 4));
        board.reveal(Cell::new(0, 0));
        assert!(!board.is_opened(Cell::new(0, 4)));
        assert!(board.is_flagged(Cell::new(0, 4)));
        assert_eq!(board.opened().len(), 23);
        assert!(!board.has_won());
    }

    #[test]
    fn flood_stops_at_numbered_border() {
        let limits = BoardLimits::default();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut board = Board::generate(&params(8, 8, 10), &limits, &mut rng).unwrap();
            let Some(start) = (0..8)
                .flat_map(|r| (0..8).map(move |c| Cell::new(r, c)))
                .find(|c| board.value(*c) == 0)
            else {
                continue;
            };

            assert!(board.reveal(start));
            assert!(!board.has_lost());
            for (&cell, &value) in board.opened() {
                assert!(value >= 0);
                if value == 0 {
                    assert!(board.neighbors(cell).all(|n| board.is_opened(n)));
                }
            }
        }
    }

    #[test]
    fn reveal_is_noop_on_flagged_or_opened() {
        let mut board = board(3, 3, &[(0, 0)]);
        board.toggle_flag(Cell::new(2, 2));
        assert!(!board.reveal(Cell::new(2, 2)));
        assert!(board.opened().is_empty());

        assert!(board.reveal(Cell::new(1, 1)));
        assert!(!board.reveal(Cell::new(1, 1)));
        assert_eq!(board.opened().len(), 1);
    }

    #[test]
    fn mine_opens_alone_and_loses() {
        let mut board = board(3, 3, &[(0, 0)]);
        assert!(board.reveal(Cell::new(0, 0)));
        assert_eq!(board.opened().len(), 1);
        assert!(board.has_lost());
        assert!(!board.has_won());
    }

    #[test]
    fn win_needs_every_safe_cell() {
        let mut board = board(2, 2, &[(0, 0)]);
        board.reveal(Cell::new(0, 1));
        board.reveal(Cell::new(1, 0));
        assert!(!board.has_won());
        board.reveal(Cell::new(1, 1));
        assert!(board.has_won());
    }

    #[test]
    fn view_lists_are_sorted() {
        let mut board = board(3, 3, &[(2, 2), (0, 1)]);
        board.toggle_flag(Cell::new(2, 0));
        board.reveal(Cell::new(1, 1));
        let view = board.view();
        assert_eq!(view.mines, vec![Cell::new(0, 1), Cell::new(2, 2)]);
        assert_eq!(view.flagged, vec![Cell::new(2, 0)]);
        assert_eq!(
            view.opened,
            vec![OpenedCell {
                row: 1,
                column: 1,
                value: 2
            }]
        );
    }
}
