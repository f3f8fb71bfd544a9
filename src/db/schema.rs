use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL,
                last_login INTEGER
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Categories table
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                price REAL NOT NULL DEFAULT 0,
                author TEXT NOT NULL,
                genre TEXT NOT NULL,
                description TEXT NOT NULL,
                image TEXT NOT NULL,
                count_in_stock INTEGER NOT NULL DEFAULT 0,
                category_id TEXT NOT NULL,
                num_reviews INTEGER NOT NULL DEFAULT 0,
                rating REAL NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (category_id) REFERENCES categories(id)
            );

            -- Reviews table (one review per user per book)
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                book_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (book_id, user_id),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_books_category ON books(category_id);
            CREATE INDEX IF NOT EXISTS idx_books_name ON books(name);
            CREATE INDEX IF NOT EXISTS idx_books_rating ON books(rating);
            CREATE INDEX IF NOT EXISTS idx_reviews_book ON reviews(book_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, username, password_hash, display_name, role, created_at, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.username,
                user.password_hash,
                user.display_name,
                user.role,
                user.created_at,
                user.last_login,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation(format!("Username '{}' already exists", user.username))
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, display_name, role, created_at, last_login
             FROM users WHERE username = ?1",
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, display_name, role, created_at, last_login
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, username, password_hash, display_name, role, created_at, last_login
                 FROM users ORDER BY username",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Update user password.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![password_hash, username],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Delete user.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
            last_login: row.get(6)?,
        })
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![session.token, session.user_id, session.expires_at],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Internal(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== CATEGORY OPERATIONS ==========

    /// Create a category.
    pub fn create_category(&self, category: &Category) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id,
                category.name,
                category.description,
                category.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create category: {}", e)))?;
        Ok(())
    }

    /// Get category by ID.
    pub fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get category: {}", e)))
    }

    /// List all categories.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, description, created_at FROM categories ORDER BY name")
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| AppError::Internal(format!("Failed to list categories: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect categories: {}", e)))?;

        Ok(categories)
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a new book.
    pub fn insert_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books
             (id, user_id, name, price, author, genre, description, image,
              count_in_stock, category_id, num_reviews, rating, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                book.id,
                book.user_id,
                book.name,
                book.price,
                book.author,
                book.genre,
                book.description,
                book.image,
                book.count_in_stock,
                book.category_id,
                book.num_reviews,
                book.rating,
                book.created_at,
                book.updated_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to insert book: {}", e)))?;
        Ok(())
    }

    /// Replace the mutable fields of a book.
    pub fn update_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE books SET
                name = ?2, price = ?3, author = ?4, genre = ?5, description = ?6,
                image = ?7, count_in_stock = ?8, category_id = ?9, num_reviews = ?10,
                rating = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                book.id,
                book.name,
                book.price,
                book.author,
                book.genre,
                book.description,
                book.image,
                book.count_in_stock,
                book.category_id,
                book.num_reviews,
                book.rating,
                book.updated_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to update book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, user_id, name, price, author, genre, description, image,
                    count_in_stock, category_id, num_reviews, rating, created_at, updated_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// Count books matching an optional case-insensitive name substring.
    pub fn count_books(&self, keyword: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        match keyword {
            Some(kw) => conn.query_row(
                "SELECT COUNT(*) FROM books
                 WHERE LOWER(name) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'",
                params![escape_like(kw)],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0)),
        }
        .map_err(|e| AppError::Internal(format!("Failed to count books: {}", e)))
    }

    /// Fetch one page of books matching an optional keyword.
    ///
    /// Page order is insertion order (explicit rowid sort); offset/limit are
    /// applied here so pagination math stays in the service layer.
    pub fn list_books(&self, keyword: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Book>> {
        let keyword = keyword.map(escape_like);
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, price, author, genre, description, image,
                        count_in_stock, category_id, num_reviews, rating, created_at, updated_at
                 FROM books
                 WHERE ?1 IS NULL OR LOWER(name) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'
                 ORDER BY rowid
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![keyword, limit, offset], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Get the highest-rated books, descending. Ties fall back to store order.
    pub fn top_rated_books(&self, limit: i64) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, price, author, genre, description, image,
                        count_in_stock, category_id, num_reviews, rating, created_at, updated_at
                 FROM books ORDER BY rating DESC LIMIT ?1",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![limit], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to get top books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Get all books in a category (unpaginated).
    pub fn get_books_by_category(&self, category_id: &str) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, name, price, author, genre, description, image,
                        count_in_stock, category_id, num_reviews, rating, created_at, updated_at
                 FROM books WHERE category_id = ?1",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![category_id], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to get books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Delete a single book by ID (hard delete, reviews cascade).
    pub fn delete_book(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])
            .map_err(|e| AppError::Internal(format!("Failed to delete book: {}", e)))?;
        Ok(rows > 0)
    }

    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            price: row.get(3)?,
            author: row.get(4)?,
            genre: row.get(5)?,
            description: row.get(6)?,
            image: row.get(7)?,
            count_in_stock: row.get(8)?,
            category_id: row.get(9)?,
            num_reviews: row.get(10)?,
            rating: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    // ========== REVIEW OPERATIONS ==========

    /// Insert a review.
    pub fn insert_review(&self, review: &Review) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reviews (id, book_id, user_id, name, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                review.id,
                review.book_id,
                review.user_id,
                review.name,
                review.rating,
                review.comment,
                review.created_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Validation("Book already reviewed".to_string())
            } else {
                AppError::Internal(format!("Failed to insert review: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get all reviews for a book, oldest first.
    pub fn get_reviews(&self, book_id: &str) -> Result<Vec<Review>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, book_id, user_id, name, rating, comment, created_at
                 FROM reviews WHERE book_id = ?1 ORDER BY created_at, id",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let reviews = stmt
            .query_map(params![book_id], |row| {
                Ok(Review {
                    id: row.get(0)?,
                    book_id: row.get(1)?,
                    user_id: row.get(2)?,
                    name: row.get(3)?,
                    rating: row.get(4)?,
                    comment: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(|e| AppError::Internal(format!("Failed to get reviews: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect reviews: {}", e)))?;

        Ok(reviews)
    }

    /// Check whether a user has already reviewed a book.
    pub fn has_review(&self, book_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reviews WHERE book_id = ?1 AND user_id = ?2",
                params![book_id, user_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to check review: {}", e)))?;
        Ok(count > 0)
    }
}

/// Escape LIKE metacharacters so keywords match as literal substrings.
fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_neutralizes_metacharacters() {
        assert_eq!(escape_like("0%"), "0\\%");
        assert_eq!(escape_like("o_f"), "o\\_f");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}

