use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A named collection of tasks owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct List {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "_userId")]
    pub user_id: Uuid,
}

impl List {
    pub fn new(input: ListInput, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            user_id,
        }
    }
}

/// Body of `POST /lists`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ListInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

/// Body of `PATCH /lists/{id}`. Absent fields are left untouched.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ListPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
}

impl ListPatch {
    pub fn apply(&self, list: &mut List) {
        if let Some(title) = &self.title {
            list.title = title.clone();
        }
    }
}
