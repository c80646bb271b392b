//! Accepted-games allow-list.
//!
//! A fresh master server accepts any game; operators narrow this with the `--accept-game`
//! CLI flag or the `accepted_games` config key to keep the registry free of unrelated
//! traffic. An empty list (the default) accepts every game.

use dpmaster_proto::messages::GameName;
use std::collections::HashSet;

/// The set of games this master will track, or "accept everything" if empty.
#[derive(Debug, Clone, Default)]
pub struct AcceptedGames(HashSet<GameName>);

impl AcceptedGames {
    /// An allow-list that accepts every game.
    pub fn all() -> Self {
        Self(HashSet::new())
    }

    /// An allow-list restricted to exactly `games`.
    pub fn only(games: impl IntoIterator<Item = GameName>) -> Self {
        Self(games.into_iter().collect())
    }

    /// Whether `game` may be tracked by this master.
    pub fn accepts(&self, game: &GameName) -> bool {
        self.0.is_empty() || self.0.contains(game)
    }
}
