use std::sync::Arc;

use chrono::Utc;
use healkit_audit_store::{
    AttemptQuery, AuditStore, HistoryQuery, InMemoryAuditRepository, SqliteAuditRepository,
};
use healkit_core_types::{HealStatus, Locator, NewHealingOutcome, NewLocatorAttempt};

const NAMES: [&str; 4] = [
    "Überweisung Button",
    "ÜBERWEISUNG Betrag",
    "Straße Eingabe",
    "login button",
];

async fn seed(store: &Arc<dyn AuditStore>) {
    let repo = store.clone().into_repository();
    for name in NAMES {
        let attempt = repo
            .insert_attempt(NewLocatorAttempt {
                element_name: name.to_string(),
                locator: Locator::id("missing"),
                page_context: "https://bank.example.test/".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        repo.insert_outcome(NewHealingOutcome {
            original_attempt_id: attempt,
            candidate: Locator::css("#missing"),
            similarity_score: 0.8,
            status: HealStatus::Failed,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }
}

async fn matching_names(store: &Arc<dyn AuditStore>, needle: &str) -> (Vec<String>, Vec<String>) {
    let view = store.clone().into_view();
    let attempts = view
        .attempts(AttemptQuery {
            element_name: Some(needle.to_string()),
            ..AttemptQuery::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|attempt| attempt.element_name)
        .collect();
    let history = view
        .healing_history(HistoryQuery {
            element_name: Some(needle.to_string()),
            ..HistoryQuery::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.element_name)
        .collect();
    (attempts, history)
}

#[tokio::test]
async fn backends_fold_non_ascii_names_alike() {
    let memory: Arc<dyn AuditStore> = Arc::new(InMemoryAuditRepository::new());
    let sqlite: Arc<dyn AuditStore> = Arc::new(SqliteAuditRepository::open_in_memory().unwrap());
    seed(&memory).await;
    seed(&sqlite).await;

    for needle in ["überweisung", "STRASSE", "straße", "BUTTON", "nothing"] {
        assert_eq!(
            matching_names(&memory, needle).await,
            matching_names(&sqlite, needle).await,
            "needle {needle}"
        );
    }

    let (attempts, history) = matching_names(&sqlite, "überweisung").await;
    assert_eq!(attempts, vec!["ÜBERWEISUNG Betrag", "Überweisung Button"]);
    assert_eq!(history, attempts);
}
