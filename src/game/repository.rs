//! Registry of active and finished games.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::play::{unix_millis, Game, GameResult, GameSnapshot, Player};
use super::record::MoveRecord;
use super::sink::{GameSink, NullSink};
use super::GameError;
use crate::board::Position;
use crate::protocol::coords;

/// Owns games by id. Finished games move from the active table to the
/// history table and stay queryable.
pub struct GameRepository {
    active: HashMap<String, Game>,
    finished: HashMap<String, Game>,
    sink: Arc<dyn GameSink>,
    rng: SmallRng,
}

impl Default for GameRepository {
    fn default() -> Self {
        GameRepository::new(Arc::new(NullSink))
    }
}

impl GameRepository {
    pub fn new(sink: Arc<dyn GameSink>) -> Self {
        GameRepository {
            active: HashMap::new(),
            finished: HashMap::new(),
            sink,
            rng: SmallRng::from_entropy(),
        }
    }

    /// A fresh id of the form `<unix seconds>_<8 hex digits>` that no game
    /// uses yet.
    pub fn next_id(&mut self) -> String {
        loop {
            let id = format!("{}_{:08x}", unix_millis() / 1000, self.rng.gen::<u32>());
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id) || self.finished.contains_key(id)
    }

    /// Creates a waiting game and returns its id. An explicit id that is
    /// already taken returns that id unchanged.
    pub fn create(
        &mut self,
        red: Player,
        black: Player,
        game_id: Option<String>,
        match_id: Option<i64>,
    ) -> String {
        let id = match game_id {
            Some(id) => id,
            None => self.next_id(),
        };
        if self.contains(&id) {
            warn!(game = %id, "game id already exists");
            return id;
        }
        let mut game = Game::new(id.clone(), red, black);
        if let Some(match_id) = match_id {
            game = game.with_match_id(match_id);
        }
        self.insert(game)
    }

    /// Registers a prepared game, e.g. one with an engine or a custom start
    /// position. An id that is already taken leaves the existing game.
    pub fn insert(&mut self, game: Game) -> String {
        let id = game.id().to_string();
        if self.contains(&id) {
            warn!(game = %id, "game id already exists");
            return id;
        }
        self.notify_created(&game.snapshot());
        info!(game = %id, "game created");
        self.active.insert(id.clone(), game);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Game> {
        self.active.get(id).or_else(|| self.finished.get(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Game> {
        match self.active.get_mut(id) {
            Some(game) => Some(game),
            None => self.finished.get_mut(id),
        }
    }

    pub fn snapshot(&self, id: &str) -> Option<GameSnapshot> {
        self.get(id).map(Game::snapshot)
    }

    pub fn start(&mut self, id: &str) -> Result<(), GameError> {
        let game = self
            .active
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownGame(id.to_string()))?;
        game.start()?;
        let snapshot = game.snapshot();
        self.notify_updated(&snapshot);
        Ok(())
    }

    /// Plays a move in an active game, reports it to the sink and archives
    /// the game if it ended.
    pub fn make_move(
        &mut self,
        id: &str,
        from: Position,
        to: Position,
    ) -> Result<MoveRecord, GameError> {
        let game = match self.active.get_mut(id) {
            Some(game) => game,
            None => {
                return Err(match self.finished.get(id) {
                    Some(done) => GameError::NotPlaying {
                        id: id.to_string(),
                        status: done.status(),
                    },
                    None => GameError::UnknownGame(id.to_string()),
                })
            }
        };
        let record = game.make_move(from, to)?;
        let over = game.is_game_over();
        if let Err(e) = self.sink.move_recorded(id, &record) {
            warn!(game = %id, error = %e, "sink rejected move record");
        }
        if over {
            self.move_to_history(id);
        }
        Ok(record)
    }

    pub fn make_coordinate_move(&mut self, id: &str, text: &str) -> Result<MoveRecord, GameError> {
        let (from, to) = coords::parse_move(text)?;
        self.make_move(id, from, to)
    }

    /// Ends an active game with the given result (or the automatic one) and
    /// moves it to the history table.
    pub fn archive(&mut self, id: &str, result: Option<GameResult>) -> Result<(), GameError> {
        let game = self
            .active
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownGame(id.to_string()))?;
        game.end(result);
        self.move_to_history(id);
        Ok(())
    }

    fn move_to_history(&mut self, id: &str) {
        if let Some(game) = self.active.remove(id) {
            self.notify_updated(&game.snapshot());
            self.finished.insert(id.to_string(), game);
        }
    }

    pub fn list_active(&self) -> Vec<GameSnapshot> {
        sorted_snapshots(self.active.values())
    }

    pub fn list_finished(&self) -> Vec<GameSnapshot> {
        sorted_snapshots(self.finished.values())
    }

    fn notify_created(&self, snapshot: &GameSnapshot) {
        if let Err(e) = self.sink.game_created(snapshot) {
            warn!(game = %snapshot.game_id, error = %e, "sink rejected new game");
        }
    }

    fn notify_updated(&self, snapshot: &GameSnapshot) {
        if let Err(e) = self.sink.game_updated(snapshot) {
            warn!(game = %snapshot.game_id, error = %e, "sink rejected game update");
        }
    }
}

fn sorted_snapshots<'a>(games: impl Iterator<Item = &'a Game>) -> Vec<GameSnapshot> {
    let mut out: Vec<GameSnapshot> = games.map(Game::snapshot).collect();
    out.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::game::sink::{MemorySink, SinkError, SinkEvent};
    use crate::game::GameStatus;

    fn players() -> (Player, Player) {
        (Player::new(1, "red"), Player::new(2, "black"))
    }

    #[test]
    fn generated_ids_have_timestamp_and_suffix() {
        let mut repo = GameRepository::default();
        let (red, black) = players();
        let id = repo.create(red, black, None, None);
        let (secs, suffix) = id.split_once('_').unwrap();
        assert!(secs.parse::<u64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn duplicate_id_returns_existing_game() {
        let mut repo = GameRepository::default();
        let (red, black) = players();
        let id = repo.create(red.clone(), black.clone(), Some("fixed".to_string()), Some(7));
        repo.start(&id).unwrap();
        let again = repo.create(red, black, Some("fixed".to_string()), Some(8));
        assert_eq!(again, "fixed");
        assert_eq!(repo.snapshot("fixed").unwrap().match_id, Some(7));
        assert_eq!(repo.list_active().len(), 1);
        assert_eq!(repo.get("fixed").unwrap().status(), GameStatus::Playing);
    }

    #[test]
    fn unknown_game() {
        let mut repo = GameRepository::default();
        assert_eq!(
            repo.make_coordinate_move("nope", "h2e2"),
            Err(GameError::UnknownGame("nope".to_string()))
        );
        assert!(repo.start("nope").is_err());
        assert!(repo.archive("nope", None).is_err());
    }

    #[test]
    fn moves_reach_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let mut repo = GameRepository::new(sink.clone());
        let (red, black) = players();
        let id = repo.create(red, black, None, None);
        repo.start(&id).unwrap();
        repo.make_coordinate_move(&id, "h2e2").unwrap();
        repo.make_coordinate_move(&id, "h7e7").unwrap();

        let moves = sink.moves_of(&id);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1].notation, "炮8平5");
        assert!(matches!(sink.events()[0], SinkEvent::GameCreated(_)));
    }

    #[test]
    fn finished_games_move_to_history() {
        let mut repo = GameRepository::default();
        let board = Board::from_fen("4k4/9/9/9/9/9/9/9/4R4/3K5 w").unwrap();
        let (red, black) = players();
        let id = repo.insert(Game::new("end", red, black).with_board(board));
        repo.start(&id).unwrap();
        repo.make_coordinate_move(&id, "e1e9").unwrap();

        assert!(repo.list_active().is_empty());
        let finished = repo.list_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].result, GameResult::RedWin);
        assert!(matches!(
            repo.make_coordinate_move(&id, "d0d1"),
            Err(GameError::NotPlaying { status: GameStatus::Finished, .. })
        ));
        assert!(repo.get(&id).is_some());
    }

    #[test]
    fn archive_with_explicit_result() {
        let mut repo = GameRepository::default();
        let (red, black) = players();
        let id = repo.create(red, black, None, None);
        repo.start(&id).unwrap();
        repo.archive(&id, Some(GameResult::Draw)).unwrap();
        assert_eq!(repo.snapshot(&id).unwrap().result, GameResult::Draw);
        assert_eq!(repo.list_finished().len(), 1);
    }

    struct FailingSink;

    impl GameSink for FailingSink {
        fn game_created(&self, _: &GameSnapshot) -> Result<(), SinkError> {
            Err(SinkError::Rejected("down".to_string()))
        }
        fn game_updated(&self, _: &GameSnapshot) -> Result<(), SinkError> {
            Err(SinkError::Rejected("down".to_string()))
        }
        fn move_recorded(&self, _: &str, _: &MoveRecord) -> Result<(), SinkError> {
            Err(SinkError::Rejected("down".to_string()))
        }
    }

    #[test]
    fn sink_failures_do_not_undo_moves() {
        let mut repo = GameRepository::new(Arc::new(FailingSink));
        let (red, black) = players();
        let id = repo.create(red, black, None, None);
        repo.start(&id).unwrap();
        let record = repo.make_coordinate_move(&id, "h2e2").unwrap();
        assert_eq!(record.notation, "炮二平五");
        assert_eq!(repo.get(&id).unwrap().moves().len(), 1);
    }
}
