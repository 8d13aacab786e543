//! The state payload broadcast to every client.

use crate::SessionState;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "RN")]
    pub random_number: u32,
    #[serde(rename = "UB")]
    pub upper_bound: u32,
    #[serde(rename = "tossHist")]
    pub toss_history: Vec<u32>,
}

impl Snapshot {
    pub fn of(state: &SessionState) -> Self {
        Self {
            random_number: state.last_roll(),
            upper_bound: state.upper_bound(),
            toss_history: state.history().iter().collect(),
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

pub fn serialize(state: &SessionState) -> Result<String, serde_json::Error> {
    Snapshot::of(state).to_payload()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{random::Scripted, Command};

    #[test]
    fn initial() {
        let state = SessionState::default();
        assert_eq!(serialize(&state).unwrap(), r#"{"RN":0,"UB":0,"tossHist":[]}"#);
    }

    #[test]
    fn after_rolls() {
        let mut state = SessionState::default();
        let mut rng = Scripted::new([2, 5]);
        state.apply(Command::Roll { bound: 6 }, &mut rng);
        state.apply(Command::Roll { bound: 6 }, &mut rng);
        assert_eq!(
            serialize(&state).unwrap(),
            r#"{"RN":5,"UB":6,"tossHist":[5,2]}"#
        );
    }

    #[test]
    fn reserialize_is_identical() {
        let mut state = SessionState::default();
        let mut rng = Scripted::new([7, 0, 13, 2]);
        for _ in 0..4 {
            state.apply(Command::Roll { bound: 20 }, &mut rng);
        }
        let payload = serialize(&state).unwrap();
        let snapshot = Snapshot::from_payload(&payload).unwrap();
        assert_eq!(snapshot, Snapshot::of(&state));
        assert_eq!(snapshot.to_payload().unwrap(), payload);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Snapshot::from_payload("{\"RN\":1}").is_err());
        assert!(Snapshot::from_payload("[SERVER]Connected").is_err());
    }
}
