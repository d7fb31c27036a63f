use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// User id plus persistent token, held for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
    token: String,
}

impl Credentials {
    pub fn new(user_id: &str, token: &str) -> Self {
        Self {
            user_id: user_id.trim().to_string(),
            token: sanitize_token(token),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Tokens copied out of dev tools usually come wrapped in quotes.
pub fn sanitize_token(raw: &str) -> String {
    raw.trim().replace(['\'', '"'], "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Active,
    Archived,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Active, Category::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Active => "active",
            Category::Archived => "archived",
        }
    }

    /// Path segment of the listing endpoint for this category.
    pub fn listing_segment(&self) -> &'static str {
        match self {
            Category::Active => "projects",
            Category::Archived => "deletedProjects",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl Project {
    /// The project's domain, or its id when the listing carries no usable domain.
    pub fn title(&self) -> &str {
        match self.domain.as_deref() {
            Some(domain) if !domain.trim().is_empty() => domain,
            _ => &self.id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListing {
    /// Items are read one by one; an unusable item is skipped, not fatal.
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<Project>,
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Project>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let project = Project::from_value(item);
            if project.is_none() {
                tracing::warn!(index = idx, "skipping listing item without a usable id");
            }
            project
        })
        .collect())
}

impl Project {
    /// Accepts a string or numeric `id`; a `domain` that is not a string is ignored.
    fn from_value(item: &Value) -> Option<Self> {
        let id = match item.get("id")? {
            Value::String(id) if !id.trim().is_empty() => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };
        let domain = item
            .get("domain")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self { id, domain })
    }
}
