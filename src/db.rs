mod schema;

pub use schema::Database;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name shown on reviews.
    pub display_name: Option<String>,
    /// User role: "admin" or "user".
    pub role: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

impl User {
    /// Name shown on reviews: display name when set, username otherwise.
    pub fn review_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// Product category. Books reference categories by ID; they are never embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique category ID.
    pub id: String,
    /// Category name.
    pub name: String,
    /// Category description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Book record as stored.
///
/// `num_reviews` and `rating` are derived from the reviews table and
/// recomputed on every review insert; they are never edited directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique book ID.
    pub id: String,
    /// Owner user ID (who created the catalog entry).
    pub user_id: String,
    /// Book name.
    pub name: String,
    /// Price (non-negative).
    pub price: f64,
    /// Author name.
    pub author: String,
    /// Genre label.
    pub genre: String,
    /// Description text.
    pub description: String,
    /// Image path or URL.
    pub image: String,
    /// Units in stock (non-negative).
    pub count_in_stock: i64,
    /// Referenced category ID.
    pub category_id: String,
    /// Derived review count.
    pub num_reviews: i64,
    /// Derived mean rating (0-5).
    pub rating: f64,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Customer review for a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Unique review ID.
    pub id: String,
    /// Book ID.
    pub book_id: String,
    /// Reviewer user ID (at most one review per (book, user)).
    pub user_id: String,
    /// Reviewer display name captured at submission time.
    pub name: String,
    /// Rating (1-5).
    pub rating: i64,
    /// Free-text comment.
    pub comment: String,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Projection of a category into book responses (name/description only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Category ID.
    pub id: String,
    /// Category name.
    pub name: String,
    /// Category description.
    pub description: String,
}

impl From<Category> for CategorySummary {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
        }
    }
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
