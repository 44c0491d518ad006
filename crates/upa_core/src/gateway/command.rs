//! Named-command channel: the remote-backed gateway and its serving router.
//!
//! # Responsibility
//! - `CommandGateway` turns gateway calls into named commands with JSON
//!   payloads and decodes the replies.
//! - `CommandRouter` serves those commands from any `UserGateway`, applying
//!   the same normalization and validation the controller does.
//!
//! # Invariants
//! - Error replies are plain strings meant for users; storage detail stays in
//!   the router's logs.
//! - Replies with an unexpected shape surface as `GatewayError::Malformed`.

use crate::gateway::{
    Confirmation, GatewayError, GatewayResult, NewUser, UserGateway, UserUpdate,
};
use crate::model::codec::decode_value;
use crate::model::user::{UserId, UserRecord};
use crate::validation::{normalize, validate, IdentifierKind};
use async_trait::async_trait;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const LIST_USERS: &str = "list_users";
pub const CREATE_USER: &str = "create_user";
pub const UPDATE_USER: &str = "update_user";
pub const DELETE_USER: &str = "delete_user";

const INVALID_DATA: &str = "Invalid data";
const SAVE_FAILED: &str = "Could not save the record";

/// Failure returned by a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    /// The command ran and answered with a user-facing error string.
    Message(String),
    /// The command could not be delivered or answered.
    Transport(String),
}

impl Display for CommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::Transport(detail) => write!(f, "transport failure: {detail}"),
        }
    }
}

impl Error for CommandFailure {}

impl From<CommandFailure> for GatewayError {
    fn from(value: CommandFailure) -> Self {
        match value {
            CommandFailure::Message(message) => Self::Rejected(message),
            CommandFailure::Transport(detail) => Self::Transport(detail),
        }
    }
}

/// Transport that invokes a named command with a JSON payload.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn invoke(&self, command: &str, payload: Value) -> Result<Value, CommandFailure>;
}

#[derive(Debug, Serialize, Deserialize)]
struct DeletePayload {
    id: UserId,
}

/// Gateway that forwards every operation over a `CommandChannel`.
#[derive(Debug)]
pub struct CommandGateway<C> {
    channel: C,
}

impl<C: CommandChannel> CommandGateway<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    async fn call<T: DeserializeOwned>(&self, command: &str, payload: Value) -> GatewayResult<T> {
        let reply = self.channel.invoke(command, payload).await?;
        serde_json::from_value(reply)
            .map_err(|err| GatewayError::Malformed(format!("{command}: {err}")))
    }
}

#[async_trait]
impl<C: CommandChannel> UserGateway for CommandGateway<C> {
    async fn list(&self) -> GatewayResult<Vec<UserRecord>> {
        let reply = self.channel.invoke(LIST_USERS, json!({})).await?;
        if !reply.is_array() {
            return Err(GatewayError::Malformed(format!(
                "{LIST_USERS}: expected a list"
            )));
        }
        Ok(decode_value(reply))
    }

    async fn create(&self, user: &NewUser) -> GatewayResult<Confirmation> {
        self.call(CREATE_USER, to_payload(user)?).await
    }

    async fn update(&self, update: &UserUpdate) -> GatewayResult<Confirmation> {
        self.call(UPDATE_USER, to_payload(update)?).await
    }

    async fn delete(&self, id: UserId) -> GatewayResult<Confirmation> {
        self.call(DELETE_USER, to_payload(&DeletePayload { id })?)
            .await
    }
}

fn to_payload(value: &impl Serialize) -> GatewayResult<Value> {
    serde_json::to_value(value).map_err(|err| GatewayError::Malformed(err.to_string()))
}

/// In-process command server dispatching to a `UserGateway`.
pub struct CommandRouter<G: ?Sized> {
    gateway: Arc<G>,
    identifier: IdentifierKind,
}

impl<G: UserGateway + ?Sized> CommandRouter<G> {
    pub fn new(gateway: Arc<G>, identifier: IdentifierKind) -> Self {
        Self {
            gateway,
            identifier,
        }
    }

    async fn create_user(&self, payload: Value) -> Result<Value, CommandFailure> {
        let input = parse_payload::<NewUser>(CREATE_USER, payload)?;
        let draft = normalize(&input.to_draft());
        validate(&draft, false, self.identifier).map_err(|err| {
            warn!("event=command module=router status=rejected command={CREATE_USER} reason={err:?}");
            CommandFailure::Message(INVALID_DATA.to_string())
        })?;

        let confirmation = self
            .gateway
            .create(&NewUser::from_draft(&draft))
            .await
            .map_err(|err| reply_error(CREATE_USER, err))?;
        encode_reply(&confirmation)
    }

    async fn update_user(&self, payload: Value) -> Result<Value, CommandFailure> {
        let input = parse_payload::<UserUpdate>(UPDATE_USER, payload)?;
        let draft = normalize(&input.to_draft());
        validate(&draft, true, self.identifier).map_err(|err| {
            warn!("event=command module=router status=rejected command={UPDATE_USER} reason={err:?}");
            CommandFailure::Message(INVALID_DATA.to_string())
        })?;

        let confirmation = self
            .gateway
            .update(&UserUpdate::from_draft(input.id, &draft))
            .await
            .map_err(|err| reply_error(UPDATE_USER, err))?;
        encode_reply(&confirmation)
    }
}

impl<G: ?Sized> std::fmt::Debug for CommandRouter<G> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<G: UserGateway + ?Sized> CommandChannel for CommandRouter<G> {
    async fn invoke(&self, command: &str, payload: Value) -> Result<Value, CommandFailure> {
        match command {
            LIST_USERS => {
                let users = self
                    .gateway
                    .list()
                    .await
                    .map_err(|err| reply_error(LIST_USERS, err))?;
                encode_reply(&users)
            }
            CREATE_USER => self.create_user(payload).await,
            UPDATE_USER => self.update_user(payload).await,
            DELETE_USER => {
                let input = parse_payload::<DeletePayload>(DELETE_USER, payload)?;
                let confirmation = self
                    .gateway
                    .delete(input.id)
                    .await
                    .map_err(|err| reply_error(DELETE_USER, err))?;
                encode_reply(&confirmation)
            }
            other => {
                warn!("event=command module=router status=rejected command={other} reason=unknown_command");
                Err(CommandFailure::Message(format!("Unknown command: {other}")))
            }
        }
    }
}

fn parse_payload<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T, CommandFailure> {
    serde_json::from_value(payload).map_err(|err| {
        warn!("event=command module=router status=rejected command={command} reason=bad_payload error={err}");
        CommandFailure::Message(INVALID_DATA.to_string())
    })
}

fn encode_reply(value: &impl Serialize) -> Result<Value, CommandFailure> {
    serde_json::to_value(value).map_err(|err| CommandFailure::Transport(err.to_string()))
}

fn reply_error(command: &str, err: GatewayError) -> CommandFailure {
    match err.user_message() {
        Some(message) => CommandFailure::Message(message),
        None => {
            error!("event=command module=router status=error command={command} error={err}");
            CommandFailure::Message(SAVE_FAILED.to_string())
        }
    }
}
