//! Catalog service: listing, lookup, mutation and review aggregation.

use crate::db::{Book, CategorySummary, Database, Review, User, now_timestamp};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Fixed page size for catalog listings.
pub const PAGE_SIZE: i64 = 10;

/// Number of books returned by the top-rated listing.
pub const TOP_RATED_COUNT: i64 = 4;

/// Book fields accepted on create and update.
///
/// All fields are optional; create substitutes defaults for missing ones,
/// update leaves missing ones untouched. Zero/empty values are treated the
/// same as missing on update (see [`CatalogService::update`]).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    /// Book name.
    pub name: Option<String>,
    /// Price.
    pub price: Option<f64>,
    /// Author name.
    pub author: Option<String>,
    /// Genre label.
    pub genre: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Image path or URL.
    pub image: Option<String>,
    /// Units in stock.
    #[serde(rename = "countInStock")]
    pub count_in_stock: Option<i64>,
    /// Referenced category ID.
    pub category: Option<String>,
}

/// Book with its category reference resolved to a summary.
#[derive(Debug, Clone, Serialize)]
pub struct BookWithCategory {
    /// The book record.
    #[serde(flatten)]
    pub book: Book,
    /// Resolved category, None if the reference is dangling.
    pub category: Option<CategorySummary>,
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    /// Books on this page, with resolved categories.
    pub books: Vec<BookWithCategory>,
    /// The page that was served (1-based).
    pub page: i64,
    /// Total page count, `ceil(count / PAGE_SIZE)`; 0 when nothing matches.
    pub pages: i64,
}

/// Stateless catalog logic over the [`Database`].
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Create a new catalog service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// List books, optionally filtered by a case-insensitive name substring.
    ///
    /// `page` is 1-based and clamped to >= 1. An empty keyword matches
    /// everything. Empty result sets are not an error.
    pub fn list(&self, keyword: Option<&str>, page: Option<i64>) -> Result<BookPage> {
        let page = page.unwrap_or(1).max(1);
        let keyword = keyword.filter(|k| !k.is_empty());

        let count = self.db.count_books(keyword)?;
        // Saturate so an absurd page number yields an empty page, not overflow
        let offset = PAGE_SIZE.saturating_mul(page - 1);
        let books = self.db.list_books(keyword, PAGE_SIZE, offset)?;

        let books = books
            .into_iter()
            .map(|b| self.resolve_category(b))
            .collect::<Result<Vec<_>>>()?;

        Ok(BookPage {
            books,
            page,
            pages: (count as u64).div_ceil(PAGE_SIZE as u64) as i64,
        })
    }

    /// Fetch one book with its category resolved. Unknown and malformed
    /// IDs both surface as NotFound.
    pub fn get_by_id(&self, id: &str) -> Result<BookWithCategory> {
        let book = self
            .db
            .get_book(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        self.resolve_category(book)
    }

    /// Create a book owned by `acting_user`.
    ///
    /// The category reference is required and must exist; every other
    /// missing field receives a placeholder default.
    pub fn create(&self, input: BookInput, acting_user: &User) -> Result<Book> {
        let category_id = input
            .category
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::Validation("Category is required".to_string()))?;

        if self.db.get_category(&category_id)?.is_none() {
            return Err(AppError::Validation("Category not found".to_string()));
        }

        let now = now_timestamp();
        let book = Book {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: acting_user.id.clone(),
            name: input.name.unwrap_or_else(|| "No name".to_string()),
            price: input.price.unwrap_or(0.0),
            author: input.author.unwrap_or_else(|| "No author".to_string()),
            genre: input.genre.unwrap_or_else(|| "Unknown".to_string()),
            description: input
                .description
                .unwrap_or_else(|| "No description".to_string()),
            image: input.image.unwrap_or_else(|| "/images/sample.jpg".to_string()),
            count_in_stock: input.count_in_stock.unwrap_or(0),
            category_id,
            num_reviews: 0,
            rating: 0.0,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_book(&book)?;
        Ok(book)
    }

    /// Partially update a book.
    ///
    /// A field is applied only when supplied with a non-zero, non-empty
    /// value; zero/empty counts as "not supplied", so stock and price
    /// cannot be reset to 0 through this operation. Known quirk kept for
    /// client compatibility.
    pub fn update(&self, id: &str, input: BookInput) -> Result<Book> {
        let mut book = self
            .db
            .get_book(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if let Some(name) = input.name.filter(|v| !v.is_empty()) {
            book.name = name;
        }
        if let Some(price) = input.price.filter(|v| *v != 0.0) {
            book.price = price;
        }
        if let Some(description) = input.description.filter(|v| !v.is_empty()) {
            book.description = description;
        }
        if let Some(image) = input.image.filter(|v| !v.is_empty()) {
            book.image = image;
        }
        if let Some(author) = input.author.filter(|v| !v.is_empty()) {
            book.author = author;
        }
        if let Some(genre) = input.genre.filter(|v| !v.is_empty()) {
            book.genre = genre;
        }
        if let Some(stock) = input.count_in_stock.filter(|v| *v != 0) {
            book.count_in_stock = stock;
        }
        if let Some(category_id) = input.category.filter(|v| !v.is_empty()) {
            if self.db.get_category(&category_id)?.is_none() {
                return Err(AppError::Validation("Category not found".to_string()));
            }
            book.category_id = category_id;
        }

        book.updated_at = now_timestamp();
        self.db.update_book(&book)?;
        Ok(book)
    }

    /// Delete a book. The existence check runs before the privilege check,
    /// so NotFound takes precedence over Unauthorized.
    pub fn delete(&self, id: &str, acting_user: &User) -> Result<()> {
        self.db
            .get_book(id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if acting_user.role != "admin" {
            return Err(AppError::Unauthorized(
                "Not authorized to delete this book".to_string(),
            ));
        }

        self.db.delete_book(id)?;
        Ok(())
    }

    /// Submit a review and recompute the book's derived rating fields.
    ///
    /// Rejects a second review by the same user for the same book. The
    /// stored `rating` is the plain arithmetic mean of all review ratings,
    /// no rounding.
    pub fn add_review(
        &self,
        book_id: &str,
        acting_user: &User,
        rating: i64,
        comment: String,
    ) -> Result<()> {
        let mut book = self
            .db
            .get_book(book_id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        if self.db.has_review(book_id, &acting_user.id)? {
            return Err(AppError::Validation("Book already reviewed".to_string()));
        }

        let review = Review {
            id: uuid::Uuid::new_v4().to_string(),
            book_id: book_id.to_string(),
            user_id: acting_user.id.clone(),
            name: acting_user.review_name().to_string(),
            rating,
            comment,
            created_at: now_timestamp(),
        };
        self.db.insert_review(&review)?;

        // Derived fields are recomputed from the full review list rather
        // than adjusted incrementally, so they cannot drift.
        let reviews = self.db.get_reviews(book_id)?;
        book.num_reviews = reviews.len() as i64;
        book.rating = mean_rating(&reviews);
        book.updated_at = now_timestamp();
        self.db.update_book(&book)?;

        Ok(())
    }

    /// The 4 highest-rated books, descending. Ties keep store order.
    pub fn top_rated(&self) -> Result<Vec<Book>> {
        self.db.top_rated_books(TOP_RATED_COUNT)
    }

    /// All books in a category, unpaginated. Store failures are logged
    /// before being propagated.
    pub fn list_by_category(&self, category_id: &str) -> Result<Vec<Book>> {
        self.db.get_books_by_category(category_id).inspect_err(|e| {
            tracing::error!(category_id, error = %e, "Failed to fetch books by category");
        })
    }

    /// Get all reviews for a book (book must exist).
    pub fn reviews(&self, book_id: &str) -> Result<Vec<Review>> {
        self.db
            .get_book(book_id)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        self.db.get_reviews(book_id)
    }

    fn resolve_category(&self, book: Book) -> Result<BookWithCategory> {
        let category = self
            .db
            .get_category(&book.category_id)?
            .map(CategorySummary::from);
        Ok(BookWithCategory { book, category })
    }
}

/// Arithmetic mean of review ratings; 0 when there are none.
fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    reviews.iter().map(|r| r.rating as f64).sum::<f64>() / reviews.len() as f64
}
