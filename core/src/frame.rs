use crate::{Snapshot, GREETING};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("json: {0}")]
    JSON(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Payload {
    Error { error: String },
    Snapshot(Snapshot),
}

/// Everything the device sends to a client.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ServerFrame {
    Greeting,
    Snapshot(Snapshot),
    Error { error: String },
}

impl ServerFrame {
    pub fn to_text(&self) -> Result<String, Error> {
        let text = match self {
            ServerFrame::Greeting => GREETING.to_string(),
            ServerFrame::Snapshot(snapshot) => snapshot.to_payload()?,
            ServerFrame::Error { error } => serde_json::to_string(&Payload::Error {
                error: error.clone(),
            })?,
        };
        Ok(text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        if text == GREETING {
            return Ok(ServerFrame::Greeting);
        }
        let frame = match serde_json::from_str(text)? {
            Payload::Error { error } => ServerFrame::Error { error },
            Payload::Snapshot(snapshot) => ServerFrame::Snapshot(snapshot),
        };
        Ok(frame)
    }
}
