use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Game actions addressable as `POST /games/<id>/<action>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Pause,
    Flag,
    Open,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Flag => "flag",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "flag" => Ok(Self::Flag),
            "open" => Ok(Self::Open),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

/// Cell coordinates carried by `flag` and `open`.
///
/// Signed so that negative coordinates reach the bounds check instead of
/// failing as a malformed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CellPayload {
    pub row: i64,
    pub column: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub title: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_case_insensitively() {
        assert_eq!("OPEN".parse::<Action>(), Ok(Action::Open));
        assert_eq!("Pause".parse::<Action>(), Ok(Action::Pause));
        assert_eq!(
            "restart".parse::<Action>(),
            Err(UnknownAction("restart".to_string()))
        );
    }

    #[test]
    fn payload_rejects_non_integer_coordinates() {
        assert!(serde_json::from_str::<CellPayload>(r#"{"row":"1","column":2}"#).is_err());
        assert!(serde_json::from_str::<CellPayload>(r#"{"row":1}"#).is_err());
        let payload: CellPayload = serde_json::from_str(r#"{"row":-1,"column":2}"#).unwrap();
        assert_eq!(payload.row, -1);
    }
}
