use sea_orm::sea_query::{BinOper, Expr, SimpleExpr};
use sea_orm::{
    EntityTrait,
    ModelTrait,
    Order,
    QueryFilter,
    QueryOrder,
    QuerySelect,
    Select,
    Value,
};
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::cursor::{parse_order, Cursor, Direction, SortKey};
use super::errors::PaginationError;

pub const DEFAULT_ORDER: &str = "id_DESC";

// Should be implemented for models that can be listed with a cursor. Maps a
// public sort key (as it appears in `order`) to a column.
pub trait PaginatedEntity: EntityTrait {
    fn sort_column(key: &str) -> Option<Self::Column>;
}

/// A resolved pagination request. The order embedded in a cursor always wins
/// over the order the client sent along with it.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub order: Vec<SortKey>,
    pub after: Option<Map<String, Json>>,
    pub take: u64,
}

impl PageQuery {
    pub fn resolve<S: AsRef<str>>(
        cursor: Option<&str>,
        order: Option<&[S]>,
        take: u64,
    ) -> Result<Self, PaginationError> {
        if take == 0 {
            return Err(PaginationError::ZeroTake);
        }
        let requested = match order {
            | Some(order) => parse_order(order)?,
            | None => vec![DEFAULT_ORDER.parse()?],
        };

        let Some(raw) = cursor else {
            return Ok(Self {
                order: requested,
                after: None,
                take,
            });
        };

        let cursor = Cursor::decode(raw)?;
        let order = cursor.sort_keys()?;
        if order != requested {
            debug!(
                cursor_order = ?cursor.order,
                "Ignoring requested order in favour of the cursor's"
            );
        }
        if order.iter().any(|k| !cursor.values.contains_key(&k.column)) {
            return Err(PaginationError::MalformedCursor);
        }
        Ok(Self {
            order,
            after: Some(cursor.values),
            take,
        })
    }

    /// How many rows to fetch. One more than a page, the extra row only
    /// tells us whether another page exists.
    pub fn query_limit(&self) -> u64 {
        self.take.saturating_add(1)
    }
}

pub trait PaginatedSelect<E: EntityTrait> {
    fn with_pagination(
        self,
        page: &PageQuery,
    ) -> Result<Select<E>, PaginationError>;
}

impl<E> PaginatedSelect<E> for Select<E>
where
    E: EntityTrait + PaginatedEntity,
{
    fn with_pagination(
        self,
        page: &PageQuery,
    ) -> Result<Select<E>, PaginationError> {
        let columns = resolve_columns::<E>(&page.order)?;
        let mut query = self;

        if let Some(ref after) = page.after {
            let mut lhs = Vec::with_capacity(columns.len());
            let mut rhs = Vec::with_capacity(columns.len());
            for (key, column) in page.order.iter().zip(&columns) {
                lhs.push(Expr::col((E::default(), *column)).into());
                let value = after
                    .get(&key.column)
                    .ok_or(PaginationError::MalformedCursor)?;
                rhs.push(SimpleExpr::Value(json_to_value(value)?));
            }
            // A single operator, chosen by the primary sort column.
            let op = match page.order[0].direction {
                | Direction::Asc => BinOper::GreaterThan,
                | Direction::Desc => BinOper::SmallerThan,
            };
            query = query.filter(SimpleExpr::Binary(
                Box::new(SimpleExpr::Tuple(lhs)),
                op,
                Box::new(SimpleExpr::Tuple(rhs)),
            ));
        }

        for (key, column) in page.order.iter().zip(columns) {
            let order = match key.direction {
                | Direction::Asc => Order::Asc,
                | Direction::Desc => Order::Desc,
            };
            query = query.order_by(column, order);
        }

        // Trick. We want to know if there is a next page, so we ask for one
        // more
        Ok(query.limit(Some(page.query_limit())))
    }
}

#[derive(Debug)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> PaginatedResponse<T> {
    pub fn map<U, F>(self, f: F) -> PaginatedResponse<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

impl<T> PaginatedResponse<T>
where
    T: ModelTrait,
    T::Entity: PaginatedEntity,
{
    pub fn paginate(
        mut results: Vec<T>,
        page: &PageQuery,
    ) -> Result<Self, PaginationError> {
        // Clip to the page size. The query asked for one extra row, if it
        // came back there is another page.
        let clip = std::cmp::min(results.len(), page.take as usize);
        let has_more = results.drain(clip..).next().is_some();

        let next_cursor = match results.last() {
            | Some(last) if has_more => {
                let columns = resolve_columns::<T::Entity>(&page.order)?;
                let mut values = Map::new();
                for (key, column) in page.order.iter().zip(columns) {
                    values.insert(key.column.clone(), value_to_json(last.get(column)));
                }
                Some(Cursor::new(values, &page.order).encode())
            }
            | _ => None,
        };

        Ok(Self {
            data: results,
            next_cursor,
        })
    }
}

fn resolve_columns<E: PaginatedEntity>(
    order: &[SortKey],
) -> Result<Vec<E::Column>, PaginationError> {
    if order.is_empty() {
        return Err(PaginationError::EmptyOrder);
    }
    order
        .iter()
        .map(|key| {
            E::sort_column(&key.column)
                .ok_or_else(|| PaginationError::InvalidOrderColumn(key.column.clone()))
        })
        .collect()
}

fn json_to_value(json: &Json) -> Result<Value, PaginationError> {
    match json {
        | Json::Bool(b) => Ok(Value::Bool(Some(*b))),
        | Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::BigInt(Some(i)))
            } else {
                n.as_f64()
                    .map(|f| Value::Double(Some(f)))
                    .ok_or(PaginationError::MalformedCursor)
            }
        }
        | Json::String(s) => Ok(Value::String(Some(Box::new(s.clone())))),
        | _ => Err(PaginationError::MalformedCursor),
    }
}

fn value_to_json(value: Value) -> Json {
    match value {
        | Value::Bool(Some(b)) => Json::from(b),
        | Value::TinyInt(Some(i)) => Json::from(i),
        | Value::SmallInt(Some(i)) => Json::from(i),
        | Value::Int(Some(i)) => Json::from(i),
        | Value::BigInt(Some(i)) => Json::from(i),
        | Value::TinyUnsigned(Some(i)) => Json::from(i),
        | Value::SmallUnsigned(Some(i)) => Json::from(i),
        | Value::Unsigned(Some(i)) => Json::from(i),
        | Value::BigUnsigned(Some(i)) => Json::from(i),
        | Value::Float(Some(f)) => Json::from(f),
        | Value::Double(Some(f)) => Json::from(f),
        | Value::String(Some(s)) => Json::from(*s),
        | _ => Json::Null,
    }
}
