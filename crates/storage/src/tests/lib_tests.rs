use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_token_loads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.load_access_token().await.expect("load"), None);
}

#[tokio::test]
async fn stored_token_is_read_back_under_the_fixed_key() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .store_access_token(&AccessToken::new("tok-123"))
        .await
        .expect("store");
    let loaded = storage.load_access_token().await.expect("load");
    assert_eq!(loaded, Some(AccessToken::new("tok-123")));

    let row: String = sqlx::query_scalar("SELECT value FROM local_state WHERE key = ?")
        .bind(ACCESS_TOKEN_KEY)
        .fetch_one(storage.pool())
        .await
        .expect("row");
    assert_eq!(row, "tok-123");
}

#[tokio::test]
async fn storing_again_overwrites_the_previous_token() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .store_access_token(&AccessToken::new("old"))
        .await
        .expect("store");
    storage
        .store_access_token(&AccessToken::new("new"))
        .await
        .expect("store");
    let loaded = storage.load_access_token().await.expect("load");
    assert_eq!(loaded, Some(AccessToken::new("new")));
}

#[tokio::test]
async fn clearing_removes_the_token() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .store_access_token(&AccessToken::new("tok-123"))
        .await
        .expect("store");
    storage.clear_access_token().await.expect("clear");
    assert_eq!(storage.load_access_token().await.expect("load"), None);

    // Clearing an already-empty store is fine.
    storage.clear_access_token().await.expect("clear again");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .store_access_token(&AccessToken::new("tok-123"))
        .await
        .expect("store");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    // Token survives a fresh open against the same file.
    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened.load_access_token().await.expect("load"),
        Some(AccessToken::new("tok-123"))
    );
}
