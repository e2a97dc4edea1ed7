//! Game simulation modules

pub mod bot;
pub mod combat;
pub mod lifecycle;
pub mod physics;
pub mod player;
pub mod ranking;
pub mod repulsion;
pub mod runner;
pub mod snapshot;
pub mod world;

pub use runner::{spawn_broadcaster, GameHandle, GameRunner};
pub use world::{AccountLink, World};

use tokio::sync::mpsc;

use crate::ws::protocol::{ClientMsg, ServerMsg};
use player::PlayerId;

/// Work for the tick task, sent by websocket sessions
#[derive(Debug)]
pub enum Command {
    /// A socket finished its handshake
    Connect {
        player_id: PlayerId,
        account: Option<AccountLink>,
        session: mpsc::UnboundedSender<SessionMsg>,
    },
    /// A parsed client event
    Client { player_id: PlayerId, msg: ClientMsg },
    /// The socket went away
    Disconnect { player_id: PlayerId },
}

/// Per-connection delivery from the tick task
#[derive(Debug, Clone)]
pub enum SessionMsg {
    Send(ServerMsg),
    /// Server-initiated close (ranked forfeit)
    Close,
}
