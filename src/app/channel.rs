//! Command channels between network tasks and the control loop.
//!
//! Uses `embassy-sync` bounded MPMC channels so that commands from any
//! task are serialised against the tick: the control loop drains
//! [`COMMANDS`] only between cycles and answers every request on
//! [`REPLIES`] under the same id.
//!
//! ```text
//! ┌──────────────┐  CommandMsg  ┌──────────────┐
//! │ HTTP / MQTT  │────────────▶│ Control loop │
//! │              │◀────────────│              │
//! └──────────────┘   ReplyMsg   └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use super::commands::AppCommand;
use crate::error::Result;

/// Caller-chosen tag pairing a reply with its command.
pub type RequestId = u32;

/// Inbound command, delivered to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMsg {
    pub id: RequestId,
    pub cmd: AppCommand,
}

/// Outcome of one command.  Rejections carry the verbatim reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMsg {
    pub id: RequestId,
    pub result: Result<()>,
}

/// Commands buffered between two ticks.
pub const COMMAND_DEPTH: usize = 8;

/// Replies buffered until the network side collects them.
pub const REPLY_DEPTH: usize = 16;

pub type CommandChannel = Channel<CriticalSectionRawMutex, CommandMsg, COMMAND_DEPTH>;
pub type ReplyChannel = Channel<CriticalSectionRawMutex, ReplyMsg, REPLY_DEPTH>;

/// Inbound command channel: network tasks → control loop.
pub static COMMANDS: CommandChannel = Channel::new();

/// Outbound reply channel: control loop → network tasks.
pub static REPLIES: ReplyChannel = Channel::new();

/// Queue a command without blocking.  Hands the command back when the
/// queue is full.
pub fn submit(channel: &CommandChannel, id: RequestId, cmd: AppCommand) -> core::result::Result<(), AppCommand> {
    channel
        .try_send(CommandMsg { id, cmd })
        .map_err(|TrySendError::Full(msg)| msg.cmd)
}
