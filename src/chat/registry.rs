//! Room → connection map owned by a single task.
//!
//! Every mutation and every broadcast goes through the command channel, so
//! connects, disconnects and deliveries are applied one at a time.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

/// Outbound frame, sent to the browser as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub user_id: i64,
    pub user_name: String,
}

/// A registered connection. Frames for it arrive on `inbox`.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub inbox: mpsc::UnboundedReceiver<ChatPayload>,
}

struct Member {
    id: ConnectionId,
    user_id: i64,
    user_name: String,
    outbox: mpsc::UnboundedSender<ChatPayload>,
}

enum Command {
    Connect {
        room_id: i64,
        member: Member,
    },
    Disconnect {
        id: ConnectionId,
    },
    Broadcast {
        room_id: i64,
        payload: ChatPayload,
        delivered: oneshot::Sender<usize>,
    },
    Presence {
        room_id: i64,
        reply: oneshot::Sender<Vec<Presence>>,
    },
}

#[derive(Clone)]
pub struct ChatRegistry {
    commands: mpsc::UnboundedSender<Command>,
}

impl ChatRegistry {
    /// Starts the owning task. It stops once every handle is dropped.
    pub fn spawn() -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run(receiver));
        Self { commands }
    }

    /// Registers a connection under `room_id`. No dedup by user.
    pub fn connect(&self, room_id: i64, user_id: i64, user_name: &str) -> Connection {
        let id = ConnectionId::new();
        let (outbox, inbox) = mpsc::unbounded_channel();

        self.send(Command::Connect {
            room_id,
            member: Member {
                id,
                user_id,
                user_name: user_name.to_owned(),
                outbox,
            },
        });

        Connection { id, inbox }
    }

    /// Removes the connection from whichever room holds it.
    pub fn disconnect(&self, id: ConnectionId) {
        self.send(Command::Disconnect { id });
    }

    /// Delivers `{sender, message}` to every connection of the room and
    /// returns how many received it.
    pub async fn broadcast(&self, room_id: i64, sender_name: &str, message: &str) -> usize {
        let (delivered, reply) = oneshot::channel();
        self.send(Command::Broadcast {
            room_id,
            payload: ChatPayload {
                sender: sender_name.to_owned(),
                message: message.to_owned(),
            },
            delivered,
        });
        reply.await.unwrap_or(0)
    }

    pub async fn presence(&self, room_id: i64) -> Vec<Presence> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Presence { room_id, reply });
        response.await.unwrap_or_default()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("chat registry task is gone");
        }
    }
}

async fn run(mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut rooms: HashMap<i64, Vec<Member>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect { room_id, member } => {
                debug!("{} joined room {room_id}", member.user_name);
                rooms.entry(room_id).or_default().push(member);
            }
            Command::Disconnect { id } => {
                for members in rooms.values_mut() {
                    members.retain(|member| member.id != id);
                }
                rooms.retain(|_, members| !members.is_empty());
            }
            Command::Broadcast { room_id, payload, delivered } => {
                let Some(members) = rooms.get_mut(&room_id) else {
                    let _ = delivered.send(0);
                    continue;
                };

                // a closed inbox means the socket is gone; drop it and keep going
                members.retain(|member| {
                    let sent = member.outbox.send(payload.clone()).is_ok();
                    if !sent {
                        debug!("pruning closed connection of {} in room {room_id}", member.user_name);
                    }
                    sent
                });
                let count = members.len();
                if members.is_empty() {
                    rooms.remove(&room_id);
                }

                let _ = delivered.send(count);
            }
            Command::Presence { room_id, reply } => {
                let present = rooms
                    .get(&room_id)
                    .map(|members| {
                        members
                            .iter()
                            .map(|member| Presence {
                                user_id: member.user_id,
                                user_name: member.user_name.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let _ = reply.send(present);
            }
        }
    }

    debug!("chat registry stopped");
}
