//! Core game state and logic

use crate::board::{Board, Cell};
use crate::piece::Piece;
use crate::randomizer::{PieceSource, Randomizer};
use crate::score::{Score, ScoringRules};
use crate::settings::ConfigError;
use crate::tetromino::{Shape, default_shapes};
use ratatui::style::Color;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Largest board dimension accepted from the configuration
pub const MAX_BOARD_SIZE: i32 = 1024;

/// Everything the simulation needs to start a game
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Board width in cells (odd widths lose a column)
    pub columns: i32,
    /// Board height in cells
    pub rows: i32,
    /// Fall interval at speed 1
    pub base_tick: Duration,
    pub scoring: ScoringRules,
    /// Canonical shape table
    pub shapes: Vec<Shape>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            columns: 16,
            rows: 30,
            base_tick: Duration::from_millis(1000),
            scoring: ScoringRules::default(),
            shapes: default_shapes(),
        }
    }
}

impl GameConfig {
    /// Playable width once odd widths are truncated
    pub fn playable_columns(&self) -> i32 {
        self.columns - self.columns % 2
    }

    /// Where every piece's anchor starts: top row, middle column
    pub fn spawn_anchor(&self) -> Cell {
        Cell::new(self.playable_columns() / 2, 0)
    }

    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let columns = self.playable_columns();
        if columns < 2 || self.rows < 1 {
            return Err(ConfigError::BoardTooSmall {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.columns > MAX_BOARD_SIZE || self.rows > MAX_BOARD_SIZE {
            return Err(ConfigError::BoardTooLarge {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.base_tick.is_zero() {
            return Err(ConfigError::InvalidTiming);
        }

        let rules = &self.scoring;
        if !(rules.score_level.is_finite() && rules.score_level > 0.0) {
            return Err(ConfigError::InvalidScoring("score_level must be positive"));
        }
        if !(rules.score_level_ratio.is_finite() && rules.score_level_ratio >= 1.0) {
            return Err(ConfigError::InvalidScoring(
                "score_level_ratio must be at least 1",
            ));
        }
        if !(rules.speed_ratio.is_finite() && rules.speed_ratio >= 1.0) {
            return Err(ConfigError::InvalidScoring("speed_ratio must be at least 1"));
        }

        if self.shapes.is_empty() {
            return Err(ConfigError::NoShapes);
        }
        let board = Board::new(self.columns, self.rows);
        let spawn = self.spawn_anchor();
        for (index, shape) in self.shapes.iter().enumerate() {
            if shape.cells.is_empty() {
                return Err(ConfigError::EmptyShape { index });
            }
            let unique: HashSet<_> = shape.cells.iter().collect();
            if unique.len() != shape.cells.len() {
                return Err(ConfigError::DuplicateCell { index });
            }
            let piece = Piece::spawn(shape, spawn);
            if !piece.cells().iter().all(|&cell| board.in_bounds(cell)) {
                return Err(ConfigError::ShapeOutOfBounds { index });
            }
        }
        Ok(())
    }
}

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Paused,
    GameOver,
    Quit,
}

/// Input actions the game can process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveDown,
    Rotate,
    Pause,
    Quit,
    /// Gravity, delivered by the fall timer
    FallTick,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The active piece merged into the board
    pub locked: bool,
    pub lines_cleared: u32,
    /// Points gained this tick
    pub points: u64,
    /// The fall interval changed and the timer needs resetting
    pub speed_changed: bool,
    /// The game ended this tick
    pub game_over: bool,
}

/// Per-frame snapshot handed to the renderer
#[derive(Debug, Clone)]
pub struct View {
    pub columns: i32,
    pub rows: i32,
    pub settled: Vec<(Cell, Color)>,
    pub active: Vec<Cell>,
    pub active_color: Color,
    pub status: String,
    pub state: GameState,
}

/// The main game struct
pub struct Game {
    board: Board,
    current_piece: Piece,
    shapes: Vec<Shape>,
    source: Box<dyn PieceSource>,
    spawn: Cell,
    base_tick: Duration,
    score: Score,
    state: GameState,
}

impl Game {
    /// Create a new game with a randomly seeded shape picker
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_source(config, Box::new(Randomizer::new()))
    }

    /// Create a new game drawing shapes from `source`
    pub fn with_source(
        config: GameConfig,
        mut source: Box<dyn PieceSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let spawn = config.spawn_anchor();
        let first = source.next_index(config.shapes.len());
        let current_piece = Piece::spawn(&config.shapes[first], spawn);

        Ok(Self {
            board: Board::new(config.columns, config.rows),
            current_piece,
            shapes: config.shapes,
            source,
            spawn,
            base_tick: config.base_tick,
            score: Score::new(config.scoring),
            state: GameState::Playing,
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Game over or quit: nothing changes any more
    pub fn is_over(&self) -> bool {
        matches!(self.state, GameState::GameOver | GameState::Quit)
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    #[allow(dead_code)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[allow(dead_code)]
    pub fn current_piece(&self) -> &Piece {
        &self.current_piece
    }

    /// Current gravity interval
    pub fn fall_interval(&self) -> Duration {
        self.score.fall_interval(self.base_tick)
    }

    pub fn status_line(&self) -> String {
        format!(
            "SCORE: {}   SPEED: {}x",
            self.score.points,
            self.score.speed_label()
        )
    }

    pub fn view(&self) -> View {
        View {
            columns: self.board.columns(),
            rows: self.board.rows(),
            settled: self.board.settled().collect(),
            active: self.current_piece.cells().to_vec(),
            active_color: self.current_piece.color(),
            status: self.status_line(),
            state: self.state,
        }
    }

    /// Run one simulation step over the actions received since the last one
    pub fn tick(&mut self, actions: &[Action]) -> TickReport {
        let mut report = TickReport::default();
        if self.is_over() {
            return report;
        }

        let mut moves = Vec::with_capacity(actions.len());
        for &action in actions {
            match action {
                Action::Quit => {
                    info!(score = self.score.points, "player quit");
                    self.state = GameState::Quit;
                    return report;
                }
                Action::Pause => {
                    self.state = match self.state {
                        GameState::Playing => GameState::Paused,
                        GameState::Paused => GameState::Playing,
                        other => other,
                    };
                    debug!(state = ?self.state, "pause toggled");
                }
                _ if self.state == GameState::Playing => moves.push(action),
                _ => {}
            }
        }
        if self.state != GameState::Playing {
            return report;
        }

        // Apply everything, then validate the result as a whole
        let before = self.current_piece.snapshot();
        for action in moves {
            self.apply(action);
        }
        let cells = self.current_piece.cells();
        let hit_floor = self
            .board
            .hits_floor(&self.current_piece.cells_at_max_row());
        let hit_wall = self.board.hits_walls(cells);
        let hit_stack = self.board.collides(cells);
        if hit_floor || hit_wall || hit_stack {
            self.current_piece.restore(before);
        }

        let can_move_down = self.can_move_down();

        if !can_move_down && self.current_piece.anchor() == self.spawn {
            info!(
                score = self.score.points,
                lines = self.score.lines,
                "spawn blocked, game over"
            );
            self.state = GameState::GameOver;
            report.game_over = true;
            return report;
        }

        if hit_floor || !can_move_down {
            self.lock_piece(&mut report);
            self.spawn_piece();
        }

        report
    }

    /// Stage and commit a single movement
    fn apply(&mut self, action: Action) {
        let piece = &mut self.current_piece;
        match action {
            Action::MoveLeft => piece.translate(-1, 0),
            Action::MoveRight => piece.translate(1, 0),
            Action::MoveDown | Action::FallTick => piece.translate(0, 1),
            Action::Rotate => piece.rotate(),
            Action::Pause | Action::Quit => return,
        }
        piece.commit();
    }

    /// Probe one row down against the stack, leaving the piece untouched
    fn can_move_down(&mut self) -> bool {
        let snapshot = self.current_piece.snapshot();
        self.current_piece.translate(0, 1);
        self.current_piece.commit();
        let blocked = self.board.collides(self.current_piece.cells());
        self.current_piece.restore(snapshot);
        !blocked
    }

    /// Merge the active piece into the board and clear the rows it completed
    fn lock_piece(&mut self, report: &mut TickReport) {
        self.board.lock(&self.current_piece);
        report.locked = true;

        // Top to bottom: clearing a row never moves the rows below it
        let mut rows: Vec<i32> = self.current_piece.cells().iter().map(|c| c.y).collect();
        rows.sort_unstable();
        rows.dedup();

        for y in rows {
            if !self.board.is_row_full(y) {
                continue;
            }
            self.board.clear_row(y);
            report.lines_cleared += 1;

            let before = self.score.points;
            if self.score.add_line(self.board.columns()) {
                report.speed_changed = true;
                debug!(
                    speed = self.score.speed,
                    next_level = self.score.score_level,
                    interval_ms = self.fall_interval().as_millis() as u64,
                    "speed up"
                );
            }
            report.points += self.score.points - before;
        }

        debug!(
            anchor = ?self.current_piece.anchor(),
            rotation = self.current_piece.rotation().degrees(),
            settled = self.board.settled_count(),
            lines = report.lines_cleared,
            score = self.score.points,
            "piece locked"
        );
    }

    fn spawn_piece(&mut self) {
        let index = self.source.next_index(self.shapes.len());
        self.current_piece = Piece::spawn(&self.shapes[index], self.spawn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randomizer::Sequence;

    const I: usize = 0;
    const O: usize = 3;

    fn config(columns: i32, rows: i32) -> GameConfig {
        GameConfig {
            columns,
            rows,
            ..GameConfig::default()
        }
    }

    fn game(config: GameConfig, shapes: Vec<usize>) -> Game {
        Game::with_source(config, Box::new(Sequence::new(shapes))).unwrap()
    }

    fn row(y: i32, xs: impl IntoIterator<Item = i32>) -> Vec<Cell> {
        xs.into_iter().map(|x| Cell::new(x, y)).collect()
    }

    #[test]
    fn test_spawn_at_top_centre() {
        let game = game(config(10, 20), vec![I]);
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 0));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.status_line(), "SCORE: 0   SPEED: 1x");
    }

    #[test]
    fn test_fall_tick_moves_down() {
        let mut game = game(config(10, 20), vec![O]);
        let report = game.tick(&[Action::FallTick]);
        assert_eq!(report, TickReport::default());
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 1));
    }

    #[test]
    fn test_wall_blocks_move() {
        let mut game = game(config(10, 20), vec![O]);
        for _ in 0..10 {
            game.tick(&[Action::MoveRight]);
        }
        // O is two wide: anchor can reach column 8 at most
        assert_eq!(game.current_piece().anchor().x, 8);
        for _ in 0..20 {
            game.tick(&[Action::MoveLeft]);
        }
        assert_eq!(game.current_piece().anchor().x, 0);
    }

    #[test]
    fn test_batch_rejected_as_a_whole() {
        let mut game = game(config(10, 20), vec![O]);
        for _ in 0..4 {
            game.tick(&[Action::MoveLeft]);
        }
        assert_eq!(game.current_piece().anchor().x, 1);

        // Second step would leave the well, so neither step applies
        game.tick(&[Action::MoveLeft, Action::MoveLeft]);
        assert_eq!(game.current_piece().anchor().x, 1);
    }

    #[test]
    fn test_rotation_against_top_wall_rejected() {
        // S rotated puts a cell above its anchor, which is on row 0
        let mut game = game(config(10, 20), vec![1]);
        let before = game.current_piece().cells().to_vec();
        game.tick(&[Action::Rotate]);
        assert_eq!(game.current_piece().cells(), before.as_slice());

        game.tick(&[Action::MoveDown]);
        game.tick(&[Action::Rotate]);
        assert_ne!(game.current_piece().cells(), before.as_slice());
    }

    #[test]
    fn test_square_moves_only_anchor() {
        let mut game = game(config(10, 20), vec![O]);
        let offsets = game.current_piece().offsets().to_vec();
        game.tick(&[Action::Rotate, Action::MoveLeft, Action::MoveDown]);
        game.tick(&[Action::MoveRight, Action::MoveRight]);
        assert_eq!(game.current_piece().offsets(), offsets.as_slice());
        assert_eq!(game.current_piece().anchor(), Cell::new(6, 1));
        let anchor = game.current_piece().anchor();
        let expected: Vec<_> = offsets.iter().map(|o| anchor.offset(o.x, o.y)).collect();
        assert_eq!(game.current_piece().cells(), expected.as_slice());
    }

    #[test]
    fn test_piece_locks_on_floor() {
        let mut game = game(config(10, 3), vec![O, I]);
        game.tick(&[Action::FallTick]); // rows 1-2, resting on the floor
        assert_eq!(game.board().settled_count(), 0);

        let report = game.tick(&[Action::FallTick]);
        assert!(report.locked);
        assert_eq!(report.lines_cleared, 0);
        assert_eq!(game.board().settled_count(), 4);
        // Next piece from the sequence
        assert_eq!(game.current_piece().cells().len(), 4);
        assert!(game.current_piece().occupies_row(0));
        assert!(!game.current_piece().occupies_row(1));
    }

    #[test]
    fn test_piece_locks_on_stack_without_input() {
        let mut game = game(config(10, 6), vec![O]);
        game.board.lock_cells(row(5, 1..10), Color::Gray);
        game.board.lock_cells(row(4, [5, 6]), Color::Gray);

        game.tick(&[Action::FallTick]); // rows 1-2
        let report = game.tick(&[]);
        assert!(!report.locked);

        // Rows 2-3, stack directly below: locks without waiting for gravity
        let report = game.tick(&[Action::FallTick]);
        assert!(report.locked);
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn test_scenario_line_clear_on_single_row_board() {
        let cfg = GameConfig {
            shapes: vec![default_shapes()[I].clone()],
            ..config(10, 1)
        };
        let mut game = game(cfg, vec![0]);
        game.board.lock_cells(row(0, (0..5).chain(9..10)), Color::Gray);

        let report = game.tick(&[Action::FallTick]);
        assert!(report.locked);
        assert!(!report.game_over);
        assert_eq!(report.lines_cleared, 1);
        assert_eq!(report.points, 10 * 100);
        assert_eq!(game.score().points, 1000);
        assert!(game.board().is_empty());
    }

    #[test]
    fn test_scenario_line_clear_after_fall() {
        let mut game = game(config(10, 2), vec![I, O]);
        game.board.lock_cells(row(1, (0..5).chain(9..10)), Color::Gray);
        game.board.lock_cells(row(0, [0]), Color::Gray);

        game.tick(&[Action::FallTick]);
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 1));
        let report = game.tick(&[Action::FallTick]);
        assert!(report.locked);
        assert_eq!(report.lines_cleared, 1);
        assert_eq!(game.score().points, 1000);
        // The lone cell from row 0 dropped into row 1
        let settled: Vec<_> = game.board().settled().map(|(c, _)| c).collect();
        assert_eq!(settled, vec![Cell::new(0, 1)]);
    }

    #[test]
    fn test_scenario_blocked_spawn_ends_game() {
        let mut game = game(config(10, 4), vec![I]);
        game.board.lock_cells(row(1, 1..10), Color::Gray);
        let settled = game.board().settled_count();

        let report = game.tick(&[]);
        assert!(report.game_over);
        assert!(!report.locked);
        assert_eq!(game.state(), GameState::GameOver);
        assert_eq!(game.board().settled_count(), settled);

        let cells = game.current_piece().cells().to_vec();
        let report = game.tick(&[Action::FallTick, Action::MoveLeft, Action::Rotate]);
        assert_eq!(report, TickReport::default());
        assert_eq!(game.current_piece().cells(), cells.as_slice());
        assert_eq!(game.score().points, 0);
        assert_eq!(game.state(), GameState::GameOver);
    }

    #[test]
    fn test_nudged_piece_does_not_end_game() {
        let mut game = game(config(10, 4), vec![O]);
        // Stack under the spawn column only
        game.board.lock_cells(row(2, [7, 8]), Color::Gray);
        let report = game.tick(&[Action::MoveRight, Action::MoveRight]);
        assert!(report.locked);
        assert!(!report.game_over);
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn test_scenario_speed_up() {
        let bar = Shape::new(&[(-2, 0), (-1, 0), (0, 0), (1, 0)], Color::Red, true);
        let cfg = GameConfig {
            columns: 4,
            rows: 1,
            base_tick: Duration::from_millis(1000),
            scoring: ScoringRules {
                point_value: 100,
                score_level: 500.0,
                score_level_ratio: 2.0,
                speed_ratio: 1.5,
            },
            shapes: vec![bar],
        };
        let mut game = game(cfg, vec![0]);

        let report = game.tick(&[Action::FallTick]);
        assert_eq!(report.lines_cleared, 1);
        assert!(!report.speed_changed);
        assert_eq!(game.fall_interval(), Duration::from_millis(1000));

        let report = game.tick(&[Action::FallTick]);
        assert!(report.speed_changed);
        assert_eq!(game.score().points, 800);
        assert_eq!(game.score().speed, 1.5);
        assert_eq!(game.score().score_level, 1000.0);
        assert_eq!(game.fall_interval(), Duration::from_millis(666));

        let report = game.tick(&[Action::FallTick]);
        assert!(report.speed_changed);
        assert_eq!(game.score().speed, 2.25);
        assert_eq!(game.fall_interval(), Duration::from_millis(444));
        assert_eq!(game.status_line(), "SCORE: 1200   SPEED: 2.25x");
    }

    #[test]
    fn test_two_rows_cleared_at_once() {
        let cfg = GameConfig {
            shapes: vec![default_shapes()[O].clone()],
            ..config(4, 2)
        };
        let mut game = game(cfg, vec![0]);
        game.board.lock_cells(row(0, [0, 1]), Color::Gray);
        game.board.lock_cells(row(1, [0, 1]), Color::Gray);

        // O spawns at columns 2-3, rows 0-1, and drops into the floor
        let report = game.tick(&[Action::FallTick]);
        assert!(report.locked);
        assert_eq!(report.lines_cleared, 2);
        assert_eq!(report.points, 800);
        assert!(game.board().is_empty());
    }

    #[test]
    fn test_pause_suspends_ticks() {
        let mut game = game(config(10, 20), vec![O]);
        game.tick(&[Action::Pause]);
        assert_eq!(game.state(), GameState::Paused);

        game.tick(&[Action::FallTick, Action::MoveLeft]);
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 0));

        game.tick(&[Action::Pause, Action::FallTick]);
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 1));
    }

    #[test]
    fn test_quit_freezes_game() {
        let mut game = game(config(10, 20), vec![O]);
        game.tick(&[Action::Quit, Action::FallTick]);
        assert_eq!(game.state(), GameState::Quit);
        assert!(game.is_over());
        game.tick(&[Action::Pause, Action::FallTick]);
        assert_eq!(game.state(), GameState::Quit);
        assert_eq!(game.current_piece().anchor(), Cell::new(5, 0));
    }

    #[test]
    fn test_view_exposes_cells_and_status() {
        let mut game = game(config(10, 20), vec![I]);
        game.board.lock_cells(row(19, [0]), Color::Blue);
        let view = game.view();
        assert_eq!(view.columns, 10);
        assert_eq!(view.rows, 20);
        assert_eq!(view.settled, vec![(Cell::new(0, 19), Color::Blue)]);
        assert_eq!(view.active.len(), 4);
        assert_eq!(view.active_color, Color::Red);
        assert_eq!(view.status, "SCORE: 0   SPEED: 1x");
        assert_eq!(view.state, GameState::Playing);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(matches!(
            config(1, 20).validate(),
            Err(ConfigError::BoardTooSmall { .. })
        ));
        assert!(matches!(
            config(10, 0).validate(),
            Err(ConfigError::BoardTooSmall { .. })
        ));

        let mut cfg = config(10, 20);
        cfg.shapes.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoShapes)));

        let mut cfg = config(10, 20);
        cfg.shapes.push(Shape::new(&[(0, 0), (0, 0)], Color::Red, true));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateCell { index: 7 })
        ));

        let mut cfg = config(10, 20);
        cfg.shapes.push(Shape::new(&[], Color::Red, true));
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyShape { index: 7 })));

        // The I piece reaches x + 3 from the spawn column
        assert!(matches!(
            config(6, 20).validate(),
            Err(ConfigError::ShapeOutOfBounds { index: 0 })
        ));

        let mut cfg = config(10, 20);
        cfg.base_tick = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTiming)));

        let mut cfg = config(10, 20);
        cfg.scoring.speed_ratio = 0.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidScoring(_))));

        assert!(matches!(
            config(10, MAX_BOARD_SIZE + 1).validate(),
            Err(ConfigError::BoardTooLarge { .. })
        ));
        assert!(matches!(
            config(MAX_BOARD_SIZE + 2, 20).validate(),
            Err(ConfigError::BoardTooLarge { .. })
        ));
        assert!(config(MAX_BOARD_SIZE, MAX_BOARD_SIZE).validate().is_ok());

        assert!(Game::new(config(1, 1)).is_err());
        assert!(GameConfig::default().validate().is_ok());
    }
}
