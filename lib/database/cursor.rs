//! Opaque pagination cursors.
//!
//! A cursor is `base64(json({"values": {...}, "order": [...]}))` where
//! `values` holds the sort-key values of the last row of a page and `order`
//! the ordering that produced it.
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::PaginationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `column_DIRECTION` entry of an order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

impl FromStr for SortKey {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last underscore, column names may contain some.
        let (column, direction) = s
            .rsplit_once('_')
            .ok_or_else(|| PaginationError::InvalidOrderDirection(s.to_owned()))?;
        let direction = match direction {
            | "ASC" => Direction::Asc,
            | "DESC" => Direction::Desc,
            | _ => {
                return Err(PaginationError::InvalidOrderDirection(
                    s.to_owned(),
                ))
            }
        };
        if column.is_empty() {
            return Err(PaginationError::InvalidOrderColumn(s.to_owned()));
        }
        Ok(Self {
            column: column.to_owned(),
            direction,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            | Direction::Asc => "ASC",
            | Direction::Desc => "DESC",
        };
        write!(f, "{}_{}", self.column, dir)
    }
}

pub fn parse_order<S: AsRef<str>>(
    order: &[S],
) -> Result<Vec<SortKey>, PaginationError> {
    if order.is_empty() {
        return Err(PaginationError::EmptyOrder);
    }
    order.iter().map(|o| o.as_ref().parse()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub values: Map<String, Value>,
    pub order: Vec<String>,
}

impl Cursor {
    pub fn new(values: Map<String, Value>, order: &[SortKey]) -> Self {
        Self {
            values,
            order: order.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a map of json values can't fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self, PaginationError> {
        let bytes = STANDARD
            .decode(raw)
            .map_err(|_| PaginationError::MalformedCursor)?;
        serde_json::from_slice(&bytes)
            .map_err(|_| PaginationError::MalformedCursor)
    }

    pub fn sort_keys(&self) -> Result<Vec<SortKey>, PaginationError> {
        parse_order(&self.order)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sort_key_parsing() {
        let key: SortKey = "likeCount_DESC".parse().unwrap();
        assert_eq!(key.column, "likeCount");
        assert_eq!(key.direction, Direction::Desc);

        let key: SortKey = "created_at_ASC".parse().unwrap();
        assert_eq!(key.column, "created_at");
        assert_eq!(key.to_string(), "created_at_ASC");

        for bad in ["id", "id_asc", "id_Desc", "id_", "id_UP"] {
            assert_eq!(
                bad.parse::<SortKey>(),
                Err(PaginationError::InvalidOrderDirection(bad.to_owned())),
                "{bad}"
            );
        }
        assert_eq!(
            "_ASC".parse::<SortKey>(),
            Err(PaginationError::InvalidOrderColumn("_ASC".to_owned()))
        );
    }

    #[test]
    fn empty_order_is_rejected() {
        let empty: Vec<String> = vec![];
        assert_eq!(parse_order(&empty), Err(PaginationError::EmptyOrder));
    }

    #[test]
    fn cursor_round_trip() {
        let order = parse_order(&["id_DESC"]).unwrap();
        let mut values = Map::new();
        values.insert("id".to_owned(), json!(11));
        let encoded = Cursor::new(values.clone(), &order).encode();

        let decoded = Cursor::decode(&encoded).unwrap();
        assert_eq!(decoded.values, values);
        assert_eq!(decoded.order, vec!["id_DESC".to_owned()]);
        assert_eq!(decoded.sort_keys().unwrap(), order);
    }

    #[test]
    fn cursor_is_base64_json() {
        let raw = STANDARD.encode(r#"{"values":{"id":3},"order":["id_ASC"]}"#);
        let cursor = Cursor::decode(&raw).unwrap();
        assert_eq!(cursor.values["id"], json!(3));
    }

    #[test]
    fn malformed_cursors() {
        let not_json = STANDARD.encode("hello");
        let wrong_shape = STANDARD.encode(r#"{"values":[1]}"#);
        for raw in ["%%%not-base64%%%", not_json.as_str(), wrong_shape.as_str()]
        {
            assert_eq!(
                Cursor::decode(raw),
                Err(PaginationError::MalformedCursor),
                "{raw}"
            );
        }
    }
}
