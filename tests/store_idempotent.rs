// tests/store_idempotent.rs
use edi_log_pipeline::store::{EventStore, SqliteStore};
use edi_log_pipeline::EventRecord;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

fn record(ts: &str, process: &str, file: &str) -> EventRecord {
    EventRecord {
        timestamp: ts.to_string(),
        process_format: process.to_string(),
        file_name: file.to_string(),
    }
}

fn sample_batch() -> Vec<EventRecord> {
    vec![
        record("01/01/2024 10:00:00", "Upload de FTP", "A.txt"),
        record("01/01/2024 10:00:00", "Upload de FTP", "B.txt"),
        record("02/01/2024 11:30:00", "Envio de e-mail por SMTP", "C.pdf"),
    ]
}

#[tokio::test]
async fn persisting_the_same_batch_twice_inserts_once() {
    let store = SqliteStore::new(memory_pool().await, "edi_logs");
    store.ensure_schema().await.unwrap();

    let first = store.insert_records(&sample_batch()).await.unwrap();
    assert_eq!(first.inserted, 3);
    assert!(first.conversion_errors.is_empty());

    let second = store.insert_records(&sample_batch()).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(store.count_records().await.unwrap(), 3);
}

#[tokio::test]
async fn malformed_timestamp_skips_only_that_row() {
    let store = SqliteStore::new(memory_pool().await, "edi_logs");
    store.ensure_schema().await.unwrap();

    let batch = vec![
        record("01/01/2024 10:00:00", "Upload de FTP", "A.txt"),
        record("not-a-date", "Upload de FTP", "B.txt"),
        record("02/01/2024 11:30:00", "Upload de FTP", "C.txt"),
    ];
    let outcome = store.insert_records(&batch).await.unwrap();
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.conversion_errors.len(), 1);
    assert_eq!(store.count_records().await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_sweep_converges_and_keeps_lowest_id() {
    // Table created without the uniqueness constraint, the way the
    // destination looked before the constraint existed; the sweep must
    // repair it.
    let pool = memory_pool().await;
    sqlx::query(
        "CREATE TABLE edi_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data TEXT NOT NULL,
            formato_processo TEXT NOT NULL,
            nome_arquivo TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    for _ in 0..3 {
        sqlx::query(
            "INSERT INTO edi_logs (data, formato_processo, nome_arquivo)
             VALUES ('2024-01-01 10:00:00', 'Upload de FTP', 'A.txt')",
        )
        .execute(&pool)
        .await
        .unwrap();
    }
    sqlx::query(
        "INSERT INTO edi_logs (data, formato_processo, nome_arquivo)
         VALUES ('2024-01-01 10:00:00', 'Upload de FTP', 'B.txt')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let store = SqliteStore::new(pool.clone(), "edi_logs");
    assert_eq!(store.remove_duplicates().await.unwrap(), 2);
    assert_eq!(store.count_records().await.unwrap(), 2);

    // Idempotent: a second sweep deletes nothing.
    assert_eq!(store.remove_duplicates().await.unwrap(), 0);

    // The survivor is the row with the lowest identity.
    let min_id: i64 = sqlx::query_scalar(
        "SELECT MIN(id) FROM edi_logs WHERE nome_arquivo = 'A.txt'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(min_id, 1);
}

#[tokio::test]
async fn schema_creation_is_repeatable() {
    let store = SqliteStore::new(memory_pool().await, "edi_logs");
    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
    assert_eq!(store.count_records().await.unwrap(), 0);
}
