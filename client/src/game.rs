/// Game-init collaborator: the engine only needs to know whether a game
/// session is already loaded (world-mismatch protection).
///
/// Errors flowing the other way — from game init toward the engine — are
/// delivered by calling [`crate::NetClient::report_game_error`] explicitly;
/// there is no implicit registration.
pub trait GameInit: Send + Sync {
    fn is_game_loaded(&self) -> bool;
}

/// Default collaborator for embeddings without game-load tracking.
pub struct NoGameInit;

impl GameInit for NoGameInit {
    fn is_game_loaded(&self) -> bool {
        false
    }
}
