use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use utility::id::{HasId, Id};

pub mod bus;
pub mod config;
pub mod observation;
pub mod route;
pub mod stop;

/// Pairs a value with the identity under which it is tracked in-memory.
///
/// Kept from the teacher's `WithId` wrapper, minus the multi-origin merging
/// machinery that surrounded it there (`WithOrigin`, `Mergable`, `Subject`,
/// `DatabaseEntry`) — this simulator has a single authoritative writer per
/// entity, so there is nothing to merge.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}
