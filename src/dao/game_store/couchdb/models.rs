use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::dao::models::GameRecord;

pub const GAME_PREFIX: &str = "game::";

/// A game stored as one CouchDB document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameRecord,
}

impl From<(GameRecord, Option<String>)> for CouchGameDocument {
    fn from((game, rev): (GameRecord, Option<String>)) -> Self {
        Self {
            id: game_doc_id(game.id),
            rev,
            game,
        }
    }
}

/// Response of a Mango `_find` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<CouchGameDocument>,
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{}{}", GAME_PREFIX, id)
}

/// Mango selector matching one game by share code.
pub fn share_code_query(share_code: &str) -> serde_json::Value {
    json!({
        "selector": {
            "_id": { "$gt": GAME_PREFIX },
            "share_code": share_code,
        },
        "limit": 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{GameMode, GameState, TeamInfo};

    #[test]
    fn document_keeps_record_fields_at_top_level() {
        let game = GameRecord {
            id: Uuid::nil(),
            share_code: "Z9Z9Z9".into(),
            home_team: TeamInfo::default(),
            away_team: TeamInfo::default(),
            mode: GameMode::Simple,
            state: GameState::default(),
            display_state: "{}".into(),
            created_at: 1,
            updated_at: 2,
        };
        let doc = CouchGameDocument::from((game.clone(), Some("1-abc".into())));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], format!("game::{}", Uuid::nil()));
        assert_eq!(json["_rev"], "1-abc");
        assert_eq!(json["share_code"], "Z9Z9Z9");
        assert_eq!(json["mode"], "simple");

        let back: CouchGameDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.game, game);
    }
}
