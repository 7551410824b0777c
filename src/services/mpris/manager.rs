use std::sync::{Arc, Weak};

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio::sync::{RwLock, broadcast, broadcast::error::RecvError};
use tracing::{debug, info, instrument, warn};
use zbus::Connection;

use super::{
    BusNameRegistry, MediaError, MediaEvent, PlayerId, PlayerSession, PlayerState, SessionPhase,
};

/// Bus name substring that wins favored-player selection.
const FAVORED_NAME_HINT: &str = "spotify";

/// The set of currently live media players.
///
/// Owns one [`PlayerSession`] per owned MPRIS bus name, in discovery
/// order. Sessions are added when the registry reports a name and removed
/// when their own owner watch closes them. Control intents are forwarded
/// to the favored player.
pub struct PlayerSet {
    connection: Connection,
    players: Arc<RwLock<Vec<(PlayerId, Arc<PlayerSession>)>>>,
    events_tx: broadcast::Sender<MediaEvent>,
    ignored_players: Vec<String>,
}

impl PlayerSet {
    /// Connect to the session bus and create an empty player set.
    ///
    /// Players whose bus name contains any of the `ignored_players`
    /// patterns are skipped during discovery.
    ///
    /// # Errors
    /// Returns error if the D-Bus session connection fails
    pub async fn new(ignored_players: Vec<String>) -> Result<Self, MediaError> {
        let connection = Connection::session().await.map_err(|e| {
            MediaError::InitializationFailed(format!("D-Bus connection failed: {e}"))
        })?;

        Ok(Self::with_connection(connection, ignored_players))
    }

    /// Create a player set on an existing bus connection.
    pub fn with_connection(connection: Connection, ignored_players: Vec<String>) -> Self {
        let (events_tx, _) = broadcast::channel(64);

        Self {
            connection,
            players: Arc::new(RwLock::new(Vec::new())),
            events_tx,
            ignored_players,
        }
    }

    /// Start player discovery.
    ///
    /// Enumerates players already on the bus, then keeps adding sessions
    /// as names gain owners. Runs until the player set is dropped.
    ///
    /// # Errors
    /// Returns error if the bus name registry cannot be started
    #[instrument(skip(self))]
    pub async fn start(self: &Arc<Self>) -> Result<(), MediaError> {
        info!("Starting MPRIS player discovery");
        let registry = BusNameRegistry::new(self.connection.clone());
        let mut discovered = registry.start().await?;

        let set = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(bus_name) = discovered.next().await {
                let Some(set) = set.upgrade() else {
                    return;
                };

                if let Err(e) = set.add_or_ignore(&bus_name).await {
                    warn!("Failed to add player {bus_name}: {e}");
                }
            }
        });

        Ok(())
    }

    /// Add a session for a bus name, unless one already exists.
    ///
    /// Duplicate additions are no-ops and emit nothing. A successful
    /// addition emits [`MediaEvent::PlayerAdded`]; when the session later
    /// closes it is removed and [`MediaEvent::PlayerRemoved`] is emitted.
    ///
    /// # Errors
    /// Returns error if session creation fails
    #[instrument(skip(self))]
    pub async fn add_or_ignore(self: &Arc<Self>, bus_name: &str) -> Result<(), MediaError> {
        if self.is_ignored(bus_name) {
            debug!("Ignoring player {bus_name}");
            return Ok(());
        }

        let id = PlayerId::from_bus_name(bus_name);
        if self.contains(&id).await {
            return Ok(());
        }

        let session =
            PlayerSession::spawn(&self.connection, id.clone(), self.events_tx.clone()).await?;

        {
            let mut players = self.players.write().await;
            if !insert_if_absent(&mut players, id.clone(), Arc::clone(&session)) {
                return Ok(());
            }
        }

        self.watch_session_close(id.clone(), &session);

        info!(player = %id, identity = session.identity(), "MPRIS player added");
        let _ = self.events_tx.send(MediaEvent::PlayerAdded(id));
        Ok(())
    }

    /// The player currently surfaced by the widget.
    ///
    /// Computed fresh from the mapping on every call: the first session
    /// whose bus name contains the favored brand, else the first session
    /// in discovery order, else `None`.
    pub async fn favored(&self) -> Option<Arc<PlayerSession>> {
        let players = self.players.read().await;
        select_favored(&players).map(|(_, session)| Arc::clone(session))
    }

    /// Look up a specific player session.
    ///
    /// # Errors
    /// Returns `MediaError::PlayerNotFound` if no session exists for the ID
    pub async fn player(&self, id: &PlayerId) -> Result<Arc<PlayerSession>, MediaError> {
        let players = self.players.read().await;
        players
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, session)| Arc::clone(session))
            .ok_or_else(|| MediaError::PlayerNotFound(id.clone()))
    }

    /// All currently tracked player IDs, in discovery order.
    pub async fn player_ids(&self) -> Vec<PlayerId> {
        let players = self.players.read().await;
        players.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Subscribe to player set events.
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events_tx.subscribe()
    }

    /// Stream of the favored player's snapshot.
    ///
    /// Yields the current snapshot immediately, then again after every
    /// event; `None` whenever the set is empty. A consumer that falls
    /// behind the event channel skips the missed events and picks back up
    /// with a fresh snapshot; the stream only ends when the set is gone.
    pub fn updated_states(&self) -> impl Stream<Item = Option<PlayerState>> + Send + use<> {
        let players = Arc::clone(&self.players);
        let mut events_rx = self.events_tx.subscribe();

        stream! {
            yield favored_state(&players).await;

            loop {
                if !event_keeps_stream_alive(&events_rx.recv().await) {
                    break;
                }
                yield favored_state(&players).await;
            }
        }
    }

    /// Toggle play/pause on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn play_pause(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.play_pause().await
    }

    /// Skip to next track on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn next(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.next().await
    }

    /// Go to previous track on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn previous(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.previous().await
    }

    /// Toggle shuffle on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn toggle_shuffle(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.toggle_shuffle().await
    }

    /// Cycle the loop status on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn cycle_loop(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.cycle_loop().await
    }

    /// Set the volume on the favored player.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn set_volume(&self, volume: f64) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.set_volume(volume).await
    }

    /// Raise the favored player's window.
    ///
    /// # Errors
    /// Returns `MediaError::NoPlayers` if the set is empty, or the
    /// forwarded control error
    pub async fn raise(&self) -> Result<(), MediaError> {
        self.favored().await.ok_or(MediaError::NoPlayers)?.raise().await
    }

    fn is_ignored(&self, bus_name: &str) -> bool {
        self.ignored_players
            .iter()
            .any(|pattern| bus_name.contains(pattern))
    }

    async fn contains(&self, id: &PlayerId) -> bool {
        let players = self.players.read().await;
        players.iter().any(|(existing, _)| existing == id)
    }

    fn watch_session_close(self: &Arc<Self>, id: PlayerId, session: &Arc<PlayerSession>) {
        let set = Arc::downgrade(self);
        let phases = session.phase_watch();

        tokio::spawn(async move {
            let mut phases = std::pin::pin!(phases);
            while let Some(phase) = phases.next().await {
                if phase == SessionPhase::Closed {
                    break;
                }
            }

            if let Some(set) = set.upgrade() {
                set.remove(&id).await;
            }
        });
    }

    async fn remove(&self, id: &PlayerId) {
        let removed = {
            let mut players = self.players.write().await;
            remove_entry(&mut players, id)
        };
        if !removed {
            return;
        }

        info!(player = %id, "MPRIS player removed");
        let _ = self.events_tx.send(MediaEvent::PlayerRemoved(id.clone()));
    }
}

/// Store an entry unless one with the same ID already exists.
///
/// Returns whether the entry was stored; duplicates leave the original
/// entry (and its discovery-order position) in place.
fn insert_if_absent<T>(players: &mut Vec<(PlayerId, T)>, id: PlayerId, session: T) -> bool {
    if players.iter().any(|(existing, _)| *existing == id) {
        return false;
    }

    players.push((id, session));
    true
}

/// Drop the entry with the given ID, reporting whether one existed.
fn remove_entry<T>(players: &mut Vec<(PlayerId, T)>, id: &PlayerId) -> bool {
    let before = players.len();
    players.retain(|(existing, _)| existing != id);
    players.len() != before
}

/// Whether the snapshot stream should keep yielding after a receive.
///
/// Lagging behind the event channel is recoverable (the next snapshot is
/// recomputed from live state anyway); only a closed channel ends the
/// stream.
fn event_keeps_stream_alive(received: &Result<MediaEvent, RecvError>) -> bool {
    match received {
        Ok(_) => true,
        Err(RecvError::Lagged(skipped)) => {
            warn!("Snapshot stream lagged, skipped {skipped} events");
            true
        }
        Err(RecvError::Closed) => false,
    }
}

async fn favored_state(
    players: &RwLock<Vec<(PlayerId, Arc<PlayerSession>)>>,
) -> Option<PlayerState> {
    let players = players.read().await;
    select_favored(&players).map(|(_, session)| session.state())
}

/// Pick the favored entry from an insertion-ordered player list.
///
/// First entry whose bus name contains the favored brand, otherwise the
/// first entry. Pure over the snapshot to avoid staleness.
fn select_favored<T>(players: &[(PlayerId, T)]) -> Option<&(PlayerId, T)> {
    players
        .iter()
        .find(|(id, _)| id.bus_name().contains(FAVORED_NAME_HINT))
        .or_else(|| players.first())
}
