use crate::auth::AuthService;
use crate::catalog::{BookInput, CatalogService, PAGE_SIZE};
use crate::config::Config;
use crate::db::{Category, Database, User, now_timestamp};
use crate::error::AppError;

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn create_user(db: &Database, id: &str, username: &str, role: &str) -> User {
    let user = User {
        id: id.to_string(),
        username: username.to_string(),
        password_hash: "hash".to_string(),
        display_name: None,
        role: role.to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&user).unwrap();
    user
}

fn create_category(db: &Database, id: &str, name: &str) {
    let category = Category {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{} books", name),
        created_at: now_timestamp(),
    };
    db.create_category(&category).unwrap();
}

fn setup() -> (Database, CatalogService, User) {
    let db = test_db();
    let user = create_user(&db, "user-1", "alice", "user");
    create_category(&db, "cat-1", "Fiction");
    let catalog = CatalogService::new(db.clone());
    (db, catalog, user)
}

fn input(name: &str, category: &str) -> BookInput {
    BookInput {
        name: Some(name.to_string()),
        category: Some(category.to_string()),
        ..Default::default()
    }
}

// ========== LISTING & PAGINATION ==========

#[test]
fn list_empty_catalog() {
    let (_db, catalog, _user) = setup();

    let page = catalog.list(None, None).unwrap();
    assert!(page.books.is_empty());
    assert_eq!(page.page, 1);
    assert_eq!(page.pages, 0);
}

#[test]
fn list_pages_are_bounded_by_page_size() {
    let (_db, catalog, user) = setup();

    for i in 0..25 {
        catalog
            .create(input(&format!("Book {:02}", i), "cat-1"), &user)
            .unwrap();
    }

    let first = catalog.list(None, Some(1)).unwrap();
    assert_eq!(first.books.len(), PAGE_SIZE as usize);
    assert_eq!(first.pages, 3); // ceil(25 / 10)

    let last = catalog.list(None, Some(3)).unwrap();
    assert_eq!(last.books.len(), 5);
    assert_eq!(last.page, 3);

    // Pages partition the catalog in insertion order: no overlap, no gaps
    let mut seen: Vec<String> = Vec::new();
    for p in 1..=3 {
        let page = catalog.list(None, Some(p)).unwrap();
        seen.extend(page.books.into_iter().map(|b| b.book.name));
    }
    assert_eq!(seen.len(), 25);
    for (i, name) in seen.iter().enumerate() {
        assert_eq!(name, &format!("Book {:02}", i));
    }

    let beyond = catalog.list(None, Some(4)).unwrap();
    assert!(beyond.books.is_empty());
    assert_eq!(beyond.pages, 3);
}

#[test]
fn list_page_clamped_to_one() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Only Book", "cat-1"), &user).unwrap();

    let zero = catalog.list(None, Some(0)).unwrap();
    assert_eq!(zero.page, 1);
    assert_eq!(zero.books.len(), 1);

    let negative = catalog.list(None, Some(-3)).unwrap();
    assert_eq!(negative.page, 1);
    assert_eq!(negative.books.len(), 1);
}

#[test]
fn list_keyword_is_case_insensitive_substring() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();
    catalog
        .create(input("Dune Messiah", "cat-1"), &user)
        .unwrap();
    catalog.create(input("Foundation", "cat-1"), &user).unwrap();

    let page = catalog.list(Some("dune"), None).unwrap();
    assert_eq!(page.books.len(), 2);
    assert!(page.books.iter().all(|b| b.book.name.contains("Dune")));

    let partial = catalog.list(Some("MESSI"), None).unwrap();
    assert_eq!(partial.books.len(), 1);
    assert_eq!(partial.books[0].book.name, "Dune Messiah");
}

#[test]
fn list_empty_keyword_matches_all() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();
    catalog.create(input("Foundation", "cat-1"), &user).unwrap();

    let all = catalog.list(Some(""), None).unwrap();
    assert_eq!(all.books.len(), 2);

    let absent = catalog.list(None, None).unwrap();
    assert_eq!(absent.books.len(), 2);
}

#[test]
fn list_keyword_wildcards_match_literally() {
    let (_db, catalog, user) = setup();
    catalog.create(input("50% off sale", "cat-1"), &user).unwrap();
    catalog.create(input("100 years", "cat-1"), &user).unwrap();

    // "%" must match only names actually containing "0%"
    let percent = catalog.list(Some("0%"), None).unwrap();
    assert_eq!(percent.books.len(), 1);
    assert_eq!(percent.books[0].book.name, "50% off sale");

    // "_" must not act as a single-character wildcard ("o_f" vs "off")
    let underscore = catalog.list(Some("o_f"), None).unwrap();
    assert!(underscore.books.is_empty());
}

#[test]
fn list_huge_page_number_is_empty() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let page = catalog.list(None, Some(i64::MAX)).unwrap();
    assert!(page.books.is_empty());
    assert_eq!(page.pages, 1);
}

#[test]
fn list_no_match_is_not_an_error() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let page = catalog.list(Some("nonexistent"), None).unwrap();
    assert!(page.books.is_empty());
    assert_eq!(page.pages, 0);
}

#[test]
fn list_resolves_category_summary() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let page = catalog.list(None, None).unwrap();
    let category = page.books[0].category.as_ref().unwrap();
    assert_eq!(category.name, "Fiction");
    assert_eq!(category.description, "Fiction books");
}

#[test]
fn book_response_embeds_category_object() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let page = catalog.list(None, None).unwrap();
    let json = serde_json::to_value(&page.books[0]).unwrap();

    // Book fields are flattened, the category rides alongside as an object
    assert_eq!(json["name"], "Dune");
    assert_eq!(json["category"]["name"], "Fiction");
    assert_eq!(json["category"]["id"], "cat-1");
    assert!(json.get("password_hash").is_none());
}

// ========== LOOKUP ==========

#[test]
fn get_by_id_returns_book_with_category() {
    let (_db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let found = catalog.get_by_id(&book.id).unwrap();
    assert_eq!(found.book.name, "Dune");
    assert_eq!(found.category.unwrap().id, "cat-1");
}

#[test]
fn get_by_id_unknown_is_not_found() {
    let (_db, catalog, _user) = setup();

    let err = catalog.get_by_id("no-such-id").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Malformed IDs fail the lookup the same way
    let err = catalog.get_by_id("!!!not-a-uuid???").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ========== CREATE ==========

#[test]
fn create_applies_defaults() {
    let (_db, catalog, user) = setup();

    let book = catalog
        .create(
            BookInput {
                name: Some("Dune".to_string()),
                category: Some("cat-1".to_string()),
                ..Default::default()
            },
            &user,
        )
        .unwrap();

    assert_eq!(book.name, "Dune");
    assert_eq!(book.price, 0.0);
    assert_eq!(book.author, "No author");
    assert_eq!(book.genre, "Unknown");
    assert_eq!(book.description, "No description");
    assert_eq!(book.image, "/images/sample.jpg");
    assert_eq!(book.count_in_stock, 0);
    assert_eq!(book.num_reviews, 0);
    assert_eq!(book.rating, 0.0);
    assert_eq!(book.user_id, user.id);
}

#[test]
fn create_defaults_name_when_missing() {
    let (_db, catalog, user) = setup();

    let book = catalog
        .create(
            BookInput {
                category: Some("cat-1".to_string()),
                ..Default::default()
            },
            &user,
        )
        .unwrap();
    assert_eq!(book.name, "No name");
}

#[test]
fn create_without_category_fails() {
    let (_db, catalog, user) = setup();

    let err = catalog
        .create(
            BookInput {
                name: Some("Dune".to_string()),
                ..Default::default()
            },
            &user,
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Category is required"));
}

#[test]
fn create_with_unknown_category_fails() {
    let (_db, catalog, user) = setup();

    let err = catalog.create(input("Dune", "no-such-cat"), &user).unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Category not found"));
}

// ========== UPDATE ==========

#[test]
fn update_replaces_supplied_fields() {
    let (_db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let updated = catalog
        .update(
            &book.id,
            BookInput {
                name: Some("Dune (Revised)".to_string()),
                price: Some(12.5),
                count_in_stock: Some(7),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Dune (Revised)");
    assert_eq!(updated.price, 12.5);
    assert_eq!(updated.count_in_stock, 7);
    // Untouched fields remain
    assert_eq!(updated.author, "No author");
}

#[test]
fn update_ignores_zero_and_empty_values() {
    let (_db, catalog, user) = setup();
    let book = catalog
        .create(
            BookInput {
                name: Some("Dune".to_string()),
                price: Some(9.99),
                count_in_stock: Some(5),
                category: Some("cat-1".to_string()),
                ..Default::default()
            },
            &user,
        )
        .unwrap();

    // Zero/empty inputs count as "not supplied"
    let updated = catalog
        .update(
            &book.id,
            BookInput {
                name: Some(String::new()),
                price: Some(0.0),
                count_in_stock: Some(0),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Dune");
    assert_eq!(updated.price, 9.99);
    assert_eq!(updated.count_in_stock, 5);
}

#[test]
fn update_unknown_book_is_not_found() {
    let (_db, catalog, _user) = setup();

    let err = catalog.update("no-such-id", BookInput::default()).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn update_with_unknown_category_fails() {
    let (_db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let err = catalog
        .update(
            &book.id,
            BookInput {
                category: Some("no-such-cat".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn update_can_move_book_to_another_category() {
    let (db, catalog, user) = setup();
    create_category(&db, "cat-2", "Sci-Fi");
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let updated = catalog
        .update(
            &book.id,
            BookInput {
                category: Some("cat-2".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.category_id, "cat-2");
}

// ========== DELETE ==========

#[test]
fn delete_requires_admin() {
    let (db, catalog, user) = setup();
    let admin = create_user(&db, "admin-1", "root", "admin");
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let err = catalog.delete(&book.id, &user).unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    // Still there
    assert!(catalog.get_by_id(&book.id).is_ok());

    catalog.delete(&book.id, &admin).unwrap();
    let err = catalog.get_by_id(&book.id).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn delete_missing_book_is_not_found_before_authorization() {
    let (_db, catalog, user) = setup();

    // Non-admin caller, nonexistent book: NotFound wins
    let err = catalog.delete("no-such-id", &user).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ========== REVIEWS ==========

#[test]
fn add_review_updates_derived_fields() {
    let (db, catalog, user) = setup();
    let other = create_user(&db, "user-2", "bob", "user");
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    catalog
        .add_review(&book.id, &user, 4, "Great".to_string())
        .unwrap();
    catalog
        .add_review(&book.id, &other, 2, "Meh".to_string())
        .unwrap();

    let found = catalog.get_by_id(&book.id).unwrap();
    assert_eq!(found.book.num_reviews, 2);
    assert!((found.book.rating - 3.0).abs() < f64::EPSILON);
}

#[test]
fn add_review_rejects_duplicate_reviewer() {
    let (_db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    catalog
        .add_review(&book.id, &user, 5, "First".to_string())
        .unwrap();
    let err = catalog
        .add_review(&book.id, &user, 1, "Second".to_string())
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Book already reviewed"));

    let found = catalog.get_by_id(&book.id).unwrap();
    assert_eq!(found.book.num_reviews, 1);
    assert!((found.book.rating - 5.0).abs() < f64::EPSILON);
}

#[test]
fn add_review_unknown_book_is_not_found() {
    let (_db, catalog, user) = setup();

    let err = catalog
        .add_review("no-such-id", &user, 4, String::new())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn add_review_rejects_out_of_range_rating() {
    let (_db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    assert!(catalog.add_review(&book.id, &user, 0, String::new()).is_err());
    assert!(catalog.add_review(&book.id, &user, 6, String::new()).is_err());
}

#[test]
fn review_captures_display_name() {
    let (db, catalog, _user) = setup();
    let reviewer = User {
        id: "user-9".to_string(),
        username: "cdoe".to_string(),
        password_hash: "hash".to_string(),
        display_name: Some("Charlie Doe".to_string()),
        role: "user".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&reviewer).unwrap();

    let owner = create_user(&db, "user-8", "owner", "user");
    let book = catalog.create(input("Dune", "cat-1"), &owner).unwrap();
    catalog
        .add_review(&book.id, &reviewer, 5, "Classic".to_string())
        .unwrap();

    let reviews = catalog.reviews(&book.id).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].name, "Charlie Doe");
    assert_eq!(reviews[0].user_id, "user-9");
}

#[test]
fn rating_mean_is_unrounded() {
    let (db, catalog, user) = setup();
    let book = catalog.create(input("Dune", "cat-1"), &user).unwrap();

    let ratings = [5, 4, 4];
    for (i, rating) in ratings.iter().enumerate() {
        let reviewer = create_user(&db, &format!("r-{}", i), &format!("reviewer{}", i), "user");
        catalog
            .add_review(&book.id, &reviewer, *rating, String::new())
            .unwrap();
    }

    let found = catalog.get_by_id(&book.id).unwrap();
    assert_eq!(found.book.num_reviews, 3);
    assert!((found.book.rating - 13.0 / 3.0).abs() < 1e-9);
}

// ========== TOP RATED ==========

#[test]
fn top_rated_returns_four_highest() {
    let (db, catalog, user) = setup();

    for i in 0..6 {
        let book = catalog
            .create(input(&format!("Book {}", i), "cat-1"), &user)
            .unwrap();
        let reviewer = create_user(&db, &format!("r-{}", i), &format!("reviewer{}", i), "user");
        // Ratings 5, 4, 3, 2, 1, 1 across the six books
        let rating = (5 - i as i64).max(1);
        catalog
            .add_review(&book.id, &reviewer, rating, String::new())
            .unwrap();
    }

    let top = catalog.top_rated().unwrap();
    assert_eq!(top.len(), 4);
    assert!((top[0].rating - 5.0).abs() < f64::EPSILON);
    for pair in top.windows(2) {
        assert!(pair[0].rating >= pair[1].rating);
    }
}

#[test]
fn top_rated_with_fewer_books_returns_all() {
    let (_db, catalog, user) = setup();
    catalog.create(input("Dune", "cat-1"), &user).unwrap();
    catalog.create(input("Foundation", "cat-1"), &user).unwrap();

    let top = catalog.top_rated().unwrap();
    assert_eq!(top.len(), 2);
}

// ========== CATEGORIES ==========

#[test]
fn list_by_category_is_unpaginated() {
    let (db, catalog, user) = setup();
    create_category(&db, "cat-2", "Sci-Fi");

    for i in 0..15 {
        catalog
            .create(input(&format!("Book {}", i), "cat-2"), &user)
            .unwrap();
    }
    catalog.create(input("Elsewhere", "cat-1"), &user).unwrap();

    let books = catalog.list_by_category("cat-2").unwrap();
    assert_eq!(books.len(), 15);
    assert!(books.iter().all(|b| b.category_id == "cat-2"));
}

#[test]
fn list_by_category_unknown_is_empty() {
    let (_db, catalog, _user) = setup();

    let books = catalog.list_by_category("no-such-cat").unwrap();
    assert!(books.is_empty());
}

#[test]
fn db_create_and_get_category() {
    let db = test_db();
    create_category(&db, "cat-1", "Fiction");

    let found = db.get_category("cat-1").unwrap().unwrap();
    assert_eq!(found.name, "Fiction");

    let all = db.list_categories().unwrap();
    assert_eq!(all.len(), 1);
}

// ========== END TO END ==========

#[test]
fn scenario_create_review_update() {
    let (db, catalog, user) = setup();
    create_category(&db, "sci-fi-id", "Sci-Fi");

    let book = catalog.create(input("Dune", "sci-fi-id"), &user).unwrap();
    assert_eq!(book.count_in_stock, 0);
    assert_eq!(book.rating, 0.0);
    assert_eq!(book.num_reviews, 0);

    let bob = create_user(&db, "user-b", "bob", "user");
    catalog.add_review(&book.id, &user, 4, String::new()).unwrap();
    catalog.add_review(&book.id, &bob, 2, String::new()).unwrap();

    let found = catalog.get_by_id(&book.id).unwrap();
    assert_eq!(found.book.num_reviews, 2);
    assert!((found.book.rating - 3.0).abs() < f64::EPSILON);

    // Zero stock in the update payload is treated as not supplied
    let updated = catalog
        .update(
            &book.id,
            BookInput {
                count_in_stock: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.count_in_stock, 0); // unchanged (was already 0)

    let restocked = catalog
        .update(
            &book.id,
            BookInput {
                count_in_stock: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(restocked.count_in_stock, 3);

    let still_stocked = catalog
        .update(
            &book.id,
            BookInput {
                count_in_stock: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(still_stocked.count_in_stock, 3); // quirk: 0 not applied
}

// ========== AUTH ==========

#[test]
fn auth_register_and_login() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    let user = auth
        .register("alice", "password123", Some("Alice".to_string()))
        .unwrap();
    assert_eq!(user.role, "user");
    assert_eq!(user.review_name(), "Alice");

    let (logged_in, token) = auth.login("alice", "password123").unwrap();
    assert_eq!(logged_in.username, "alice");
    assert!(!token.is_empty());
}

#[test]
fn auth_validate_token() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    auth.create_user("alice", "pass1234", None, "admin").unwrap();
    let (_, token) = auth.login("alice", "pass1234").unwrap();

    let user = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(user.username, "alice");

    assert!(auth.validate_token("invalid_token").unwrap().is_none());
}

#[test]
fn auth_logout_invalidates_token() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    auth.create_user("bob", "password", None, "user").unwrap();
    let (_, token) = auth.login("bob", "password").unwrap();

    auth.logout(&token).unwrap();
    assert!(auth.validate_token(&token).unwrap().is_none());
}

#[test]
fn auth_registration_disabled() {
    let db = test_db();
    let auth = AuthService::new(db, 30, false);

    let result = auth.register("newuser", "password", None);
    assert!(result.is_err());
}

#[test]
fn auth_invalid_password() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    auth.create_user("user", "correct", None, "user").unwrap();
    assert!(auth.login("user", "wrong").is_err());
}

#[test]
fn auth_is_admin() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    let admin = auth.create_user("admin", "password", None, "admin").unwrap();
    let user = auth.create_user("user", "password", None, "user").unwrap();

    assert!(auth.is_admin(&admin));
    assert!(!auth.is_admin(&user));
}

#[test]
fn auth_review_name_falls_back_to_username() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    let user = auth.create_user("plain", "password", None, "user").unwrap();
    assert_eq!(user.review_name(), "plain");
}

#[test]
fn db_expired_sessions_cleanup() {
    let db = test_db();
    create_user(&db, "user-1", "testuser", "user");

    let expired = crate::db::Session {
        token: "expired".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() - 3600,
    };
    let valid = crate::db::Session {
        token: "valid".to_string(),
        user_id: "user-1".to_string(),
        expires_at: now_timestamp() + 3600,
    };

    db.create_session(&expired).unwrap();
    db.create_session(&valid).unwrap();

    db.cleanup_expired_sessions().unwrap();

    assert!(db.get_session("expired").unwrap().is_none());
    assert!(db.get_session("valid").unwrap().is_some());
}

#[test]
fn db_duplicate_username_fails() {
    let db = test_db();
    create_user(&db, "user-1", "alice", "user");

    let dup = User {
        id: "user-2".to_string(),
        username: "alice".to_string(),
        password_hash: "hash2".to_string(),
        display_name: None,
        role: "user".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    assert!(db.create_user(&dup).is_err());
}

// ========== CONFIG & PERSISTENCE ==========

#[test]
fn config_parse_toml() {
    let toml = r#"
[server]
bind = "127.0.0.1:9090"
title = "Test Store"

[database]
path = "/tmp/test.db"

[auth]
registration = "disabled"
session_days = 7
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.server.title, "Test Store");
    assert!(!config.auth.registration_enabled());
    assert_eq!(config.auth.session_days, 7);
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 5000);
    assert!(config.auth.registration_enabled());
    assert_eq!(config.database.path, std::path::PathBuf::from("data/bookstore.db"));
}

#[test]
fn db_on_disk_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let db = Database::open(&path).unwrap();
        let user = create_user(&db, "user-1", "alice", "user");
        create_category(&db, "cat-1", "Fiction");
        let catalog = CatalogService::new(db);
        catalog.create(input("Dune", "cat-1"), &user).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let catalog = CatalogService::new(db);
    let page = catalog.list(None, None).unwrap();
    assert_eq!(page.books.len(), 1);
    assert_eq!(page.books[0].book.name, "Dune");
}
