use sqlx::Row;

fn database_url() -> String {
    // Integration tests read the same variables as the app, without its config layer.
    dotenvy::dotenv().ok();

    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }

    let server = std::env::var("POSTGRES_SERVER").unwrap_or_else(|_| "localhost".into());
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
    let user = std::env::var("POSTGRES_USER").unwrap_or_else(|_| "coursecert".into());
    let password = std::env::var("POSTGRES_PASSWORD").unwrap_or_default();
    let db = std::env::var("POSTGRES_DB").unwrap_or_else(|_| "coursecert_db".into());

    format!("postgresql://{user}:{password}@{server}:{port}/{db}")
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url()).await?;

    let migrations_dir =
        std::env::var("COURSECERT_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let tables = [
        "users",
        "courses",
        "course_contents",
        "enrollments",
        "quizzes",
        "quiz_attempts",
        "certificates",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    let index = sqlx::query("SELECT to_regclass('uq_quiz_attempts_in_progress')::text")
        .fetch_one(&pool)
        .await?;
    let regclass: Option<String> = index.try_get(0)?;
    assert!(regclass.is_some(), "partial in-progress index missing");

    // Attempts and certificates are records; deleting their parents must fail.
    let rules = sqlx::query(
        "SELECT conrelid::regclass::text, confdeltype::text
         FROM pg_constraint
         WHERE contype = 'f' AND conrelid::regclass::text IN ('quiz_attempts', 'certificates')",
    )
    .fetch_all(&pool)
    .await?;
    assert!(!rules.is_empty(), "record tables have no foreign keys");
    for row in rules {
        let table: String = row.try_get(0)?;
        let on_delete: String = row.try_get(1)?;
        assert_eq!(on_delete, "r", "{table} foreign key must restrict deletes");
    }

    Ok(())
}
