use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bumper_core::net::close_codes;
use bumper_core::player::{Player, PlayerId, PlayerNumber};

use crate::game_loop::{MatchBroadcast, MatchCommand, MatchSettings, spawn_match};
use crate::state::SharedMatchManager;

/// What the writer task puts on a player's socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(Bytes),
    /// Close the socket with this code.
    Close(u16),
}

/// Per-player sender for outbound WebSocket frames.
/// Bounded to prevent memory exhaustion from slow clients.
pub type PlayerSender = mpsc::Sender<Outbound>;

type SenderMap = Arc<Mutex<HashMap<PlayerId, PlayerSender>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The match has ended, or both seats belong to other players.
    MatchGone,
    /// The player is seated in another live match, or already connected.
    AlreadyInGame,
}

impl JoinError {
    pub fn close_code(self) -> u16 {
        match self {
            Self::MatchGone => close_codes::MATCH_GONE,
            Self::AlreadyInGame => close_codes::ALREADY_IN_GAME,
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchGone => write!(f, "match no longer exists or has already ended"),
            Self::AlreadyInGame => write!(f, "player is already in another game"),
        }
    }
}

impl std::error::Error for JoinError {}

/// A seat taken by a connection.
#[derive(Debug, Clone)]
pub struct JoinAccepted {
    pub number: PlayerNumber,
    pub rejoin: bool,
    pub commands: mpsc::UnboundedSender<MatchCommand>,
}

struct MatchEntry {
    seats: Vec<PlayerId>,
    connected: HashSet<PlayerId>,
    command_tx: mpsc::UnboundedSender<MatchCommand>,
    /// Shared with the broadcast forwarder so rejoining players are reached.
    senders: SenderMap,
    task: JoinHandle<()>,
}

/// Tracks live matches, who sits where, and recently ended match ids.
pub struct MatchManager {
    matches: HashMap<String, MatchEntry>,
    player_matches: HashMap<PlayerId, String>,
    ended: VecDeque<String>,
    ended_set: HashSet<String>,
    max_ended: usize,
    settings: MatchSettings,
}

impl MatchManager {
    pub fn new(settings: MatchSettings, max_ended: usize) -> Self {
        Self {
            matches: HashMap::new(),
            player_matches: HashMap::new(),
            ended: VecDeque::new(),
            ended_set: HashSet::new(),
            max_ended,
            settings,
        }
    }

    /// Seat `player_id` in `match_id`, creating the match on first join.
    /// `manager` is the shared handle the match uses to clean up after itself.
    pub fn join(
        &mut self,
        match_id: &str,
        player_id: PlayerId,
        display_name: &str,
        sender: PlayerSender,
        manager: &SharedMatchManager,
    ) -> Result<JoinAccepted, JoinError> {
        if self.ended_set.contains(match_id) {
            return Err(JoinError::MatchGone);
        }
        if let Some(current) = self.player_matches.get(&player_id)
            && current != match_id
        {
            return Err(JoinError::AlreadyInGame);
        }

        if !self.matches.contains_key(match_id) {
            let entry = self.spawn_entry(match_id, manager);
            self.matches.insert(match_id.to_string(), entry);
            tracing::info!(match_id, "Match created");
        }
        let Some(entry) = self.matches.get_mut(match_id) else {
            return Err(JoinError::MatchGone);
        };

        let (index, rejoin) = match entry.seats.iter().position(|&id| id == player_id) {
            Some(_) if entry.connected.contains(&player_id) => {
                return Err(JoinError::AlreadyInGame);
            },
            Some(index) => (index, true),
            None if entry.seats.len() >= 2 => return Err(JoinError::MatchGone),
            None => (entry.seats.len(), false),
        };
        let number = bumper_core::player::player_number(index);

        // Registered before the loop hears of the join so its first
        // messages reach the player.
        entry
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player_id, sender);

        let player = Player {
            id: player_id,
            display_name: display_name.to_string(),
            number,
        };
        if entry.command_tx.send(MatchCommand::Join { player }).is_err() {
            // The loop has exited and `finish` has not run yet.
            entry
                .senders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&player_id);
            tracing::debug!(match_id, player_id, "Join raced a finished match");
            return Err(JoinError::MatchGone);
        }

        if !rejoin {
            entry.seats.push(player_id);
        }
        entry.connected.insert(player_id);
        self.player_matches
            .insert(player_id, match_id.to_string());

        Ok(JoinAccepted {
            number,
            rejoin,
            commands: entry.command_tx.clone(),
        })
    }

    fn spawn_entry(&self, match_id: &str, manager: &SharedMatchManager) -> MatchEntry {
        let (command_tx, broadcast_rx, task) =
            spawn_match(match_id.to_string(), self.settings.clone());
        let senders: SenderMap = Arc::new(Mutex::new(HashMap::new()));

        let shared_senders = Arc::clone(&senders);
        let match_id_owned = match_id.to_string();
        let manager = Arc::clone(manager);
        tokio::spawn(async move {
            forward_broadcasts(broadcast_rx, shared_senders, &match_id_owned).await;
            manager.write().await.finish(&match_id_owned);
        });

        MatchEntry {
            seats: Vec::with_capacity(2),
            connected: HashSet::new(),
            command_tx,
            senders,
            task,
        }
    }

    /// A connection went away. The seat stays reserved for a rejoin.
    pub fn leave(&mut self, match_id: &str, player_id: PlayerId) {
        let Some(entry) = self.matches.get_mut(match_id) else {
            return;
        };
        if !entry.connected.remove(&player_id) {
            return;
        }
        entry
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player_id);
        if let Err(e) = entry.command_tx.send(MatchCommand::Leave { player_id }) {
            tracing::debug!(match_id, player_id, error = %e, "Match loop gone");
        }
    }

    /// Forget a match whose loop has exited and remember its id as ended.
    pub fn finish(&mut self, match_id: &str) {
        let Some(entry) = self.matches.remove(match_id) else {
            return;
        };
        entry.task.abort();
        for id in &entry.seats {
            if self.player_matches.get(id).is_some_and(|m| m == match_id) {
                self.player_matches.remove(id);
            }
        }
        if self.max_ended > 0 && self.ended_set.insert(match_id.to_string()) {
            self.ended.push_back(match_id.to_string());
            while self.ended.len() > self.max_ended {
                if let Some(old) = self.ended.pop_front() {
                    self.ended_set.remove(&old);
                }
            }
        }
        tracing::info!(match_id, "Match finished");
    }

    /// Ask every live match loop to stop. Each loop then ends its match and
    /// closes the sockets of its players.
    pub fn stop_all(&self) {
        for (match_id, entry) in &self.matches {
            if entry.command_tx.send(MatchCommand::Stop).is_err() {
                tracing::debug!(match_id, "Match loop already gone");
            }
        }
    }

    pub fn is_ended(&self, match_id: &str) -> bool {
        self.ended_set.contains(match_id)
    }

    /// (live matches, connected players)
    pub fn stats(&self) -> (usize, usize) {
        let players = self.matches.values().map(|e| e.connected.len()).sum();
        (self.matches.len(), players)
    }
}

/// Forward match broadcasts to the connected players of one match, then
/// close their sockets normally once the match is over.
async fn forward_broadcasts(
    mut broadcast_rx: mpsc::UnboundedReceiver<MatchBroadcast>,
    senders: SenderMap,
    match_id: &str,
) {
    while let Some(broadcast) = broadcast_rx.recv().await {
        let snapshot = senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match broadcast {
            MatchBroadcast::All(data) => {
                for (&player_id, sender) in &snapshot {
                    if sender.try_send(Outbound::Frame(data.clone())).is_err() {
                        tracing::debug!(
                            player_id,
                            match_id,
                            "Skipping broadcast to slow client (channel full or closed)"
                        );
                    }
                }
            },
            MatchBroadcast::To { player_id, data } => {
                if let Some(sender) = snapshot.get(&player_id)
                    && sender.try_send(Outbound::Frame(data)).is_err()
                {
                    tracing::debug!(player_id, match_id, "Skipping message to slow client");
                }
            },
            MatchBroadcast::Ended => {
                for sender in snapshot.values() {
                    let _ = sender.try_send(Outbound::Close(close_codes::NORMAL));
                }
                tracing::info!(match_id, "Match loop ended");
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::RwLock;

    fn shared() -> SharedMatchManager {
        Arc::new(RwLock::new(MatchManager::new(MatchSettings::default(), 2)))
    }

    fn make_sender() -> (PlayerSender, mpsc::Receiver<Outbound>) {
        mpsc::channel(256)
    }

    #[tokio::test]
    async fn seats_are_numbered_in_join_order() {
        let shared = shared();
        let mut mgr = shared.write().await;
        let a = mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap();
        let b = mgr.join("m", 2, "bob", make_sender().0, &shared).unwrap();
        assert_eq!((a.number, b.number), (1, 2));
        assert!(!a.rejoin && !b.rejoin);
        assert_eq!(mgr.stats(), (1, 2));
    }

    #[tokio::test]
    async fn third_player_is_turned_away() {
        let shared = shared();
        let mut mgr = shared.write().await;
        mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap();
        mgr.join("m", 2, "bob", make_sender().0, &shared).unwrap();
        let err = mgr.join("m", 3, "cy", make_sender().0, &shared).unwrap_err();
        assert_eq!(err, JoinError::MatchGone);
        assert_eq!(err.close_code(), 4000);
    }

    #[tokio::test]
    async fn player_cannot_sit_in_two_matches() {
        let shared = shared();
        let mut mgr = shared.write().await;
        mgr.join("m1", 1, "ann", make_sender().0, &shared).unwrap();
        let err = mgr.join("m2", 1, "ann", make_sender().0, &shared).unwrap_err();
        assert_eq!(err, JoinError::AlreadyInGame);
        assert_eq!(err.close_code(), 4001);
    }

    #[tokio::test]
    async fn second_live_connection_is_rejected() {
        let shared = shared();
        let mut mgr = shared.write().await;
        mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap();
        assert_eq!(
            mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap_err(),
            JoinError::AlreadyInGame
        );
    }

    #[tokio::test]
    async fn dropped_player_rejoins_same_seat() {
        let shared = shared();
        let mut mgr = shared.write().await;
        mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap();
        mgr.join("m", 2, "bob", make_sender().0, &shared).unwrap();
        mgr.leave("m", 2);
        assert_eq!(mgr.stats(), (1, 1));
        let again = mgr.join("m", 2, "bob", make_sender().0, &shared).unwrap();
        assert_eq!(again.number, 2);
        assert!(again.rejoin);
    }

    #[tokio::test]
    async fn join_into_exited_loop_is_refused_and_undone() {
        let shared = shared();
        let mut mgr = shared.write().await;
        let first = mgr.join("m", 1, "ann", make_sender().0, &shared).unwrap();
        first.commands.send(MatchCommand::Stop).unwrap();
        // The forwarder cannot call `finish` while this lock is held.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let err = mgr.join("m", 2, "bob", make_sender().0, &shared).unwrap_err();
        assert_eq!(err, JoinError::MatchGone);
        let entry = &mgr.matches["m"];
        assert_eq!(entry.seats, vec![1]);
        assert!(!entry.connected.contains(&2));
        assert!(
            !entry
                .senders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&2)
        );
        assert!(!mgr.player_matches.contains_key(&2));
        drop(mgr);

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(shared.read().await.is_ended("m"));
        // Bob was never seated, so he is free to play elsewhere.
        let mut mgr = shared.write().await;
        assert!(mgr.join("other", 2, "bob", make_sender().0, &shared).is_ok());
    }

    #[tokio::test]
    async fn stop_all_closes_players_normally() {
        let shared = shared();
        let (tx, mut rx) = make_sender();
        shared
            .write()
            .await
            .join("m", 1, "ann", tx, &shared)
            .unwrap();
        shared.read().await.stop_all();

        let close = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Some(Outbound::Close(code)) => return Some(code),
                    Some(Outbound::Frame(_)) => continue,
                    None => return None,
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(close, Some(close_codes::NORMAL));
    }

    #[tokio::test]
    async fn ended_matches_are_remembered_up_to_limit() {
        let shared = shared();
        let mut mgr = shared.write().await;
        for id in ["a", "b", "c"] {
            mgr.join(id, 1, "ann", make_sender().0, &shared).unwrap();
            mgr.finish(id);
        }
        assert!(!mgr.is_ended("a"), "oldest evicted");
        assert!(mgr.is_ended("b") && mgr.is_ended("c"));
        assert_eq!(
            mgr.join("c", 5, "eve", make_sender().0, &shared).unwrap_err(),
            JoinError::MatchGone
        );
        // Finishing freed the player for another match.
        assert!(mgr.join("d", 1, "ann", make_sender().0, &shared).is_ok());
    }
}
