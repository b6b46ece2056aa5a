#[cfg(test)]
mod tests {
    use crate::auth::credentials::CredentialService;
    use crate::common::generate_subscription_id;
    use crate::common::migrations::run_migrations;
    use crate::sync::models::{StreamMessage, SubscriptionScope};
    use crate::sync::subscriptions::SubscriptionManager;
    use crate::tasks::service::TaskService;
    use axum::extract::ws::Message;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use tokio::sync::mpsc;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn register_user(pool: &SqlitePool, email: &str) -> String {
        CredentialService::new(pool.clone())
            .register(email, "pw1234")
            .await
            .expect("registration should succeed")
            .id
    }

    /// Open a subscription the way the WebSocket handler does and drain the
    /// Connected frame, leaving the receiver positioned at the first snapshot
    async fn open_subscription(
        manager: &SubscriptionManager,
        pool: &SqlitePool,
        user_id: &str,
        scope: SubscriptionScope,
    ) -> (String, mpsc::UnboundedReceiver<Message>) {
        let subscription_id = generate_subscription_id();
        let (tx, rx) = mpsc::unbounded_channel();
        manager
            .register(user_id.to_string(), subscription_id.clone(), scope, tx)
            .await;
        let _ = manager
            .send_to_subscription(
                &subscription_id,
                StreamMessage::Connected {
                    subscription_id: subscription_id.clone(),
                },
            )
            .await;
        manager.send_initial_snapshot(pool, &subscription_id).await;

        let mut rx = rx;
        let connected = next_message(&mut rx);
        assert!(matches!(connected, StreamMessage::Connected { .. }));

        (subscription_id, rx)
    }

    fn next_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> StreamMessage {
        let msg = rx.try_recv().expect("expected a queued stream message");
        match msg {
            Message::Text(json) => serde_json::from_str(&json).expect("valid stream message"),
            other => panic!("unexpected ws frame: {:?}", other),
        }
    }

    fn expect_list(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        match next_message(rx) {
            StreamMessage::TaskListSnapshot { tasks } => {
                tasks.into_iter().map(|t| t.id).collect()
            }
            other => panic!("expected TaskListSnapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_delivers_current_state_immediately() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "sub@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let existing = service.add_task(&owner, "already there", "").await.expect("add");

        let (_id, mut rx) =
            open_subscription(&manager, &pool, &owner, SubscriptionScope::OwnerTasks).await;

        assert_eq!(expect_list(&mut rx), vec![existing.id]);
        assert!(rx.try_recv().is_err(), "no further events without mutations");
    }

    #[tokio::test]
    async fn test_each_mutation_yields_one_snapshot_in_commit_order() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "order@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let (_id, mut rx) =
            open_subscription(&manager, &pool, &owner, SubscriptionScope::OwnerTasks).await;
        assert_eq!(expect_list(&mut rx), Vec::<String>::new());

        let first = service.add_task(&owner, "first", "").await.expect("add");
        manager.publish(&pool, &owner, Some(&first.id)).await;

        let second = service.add_task(&owner, "second", "").await.expect("add");
        manager.publish(&pool, &owner, Some(&second.id)).await;

        assert!(service.delete_task(&owner, &first.id).await.expect("delete"));
        manager.publish(&pool, &owner, Some(&first.id)).await;

        assert_eq!(expect_list(&mut rx), vec![first.id.clone()]);
        assert_eq!(expect_list(&mut rx), vec![first.id.clone(), second.id.clone()]);
        assert_eq!(expect_list(&mut rx), vec![second.id]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_foreign_mutations_do_not_reach_other_subscribers() {
        let pool = test_pool().await;
        let u = register_user(&pool, "mine@example.com").await;
        let v = register_user(&pool, "theirs@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let (_id, mut rx) =
            open_subscription(&manager, &pool, &u, SubscriptionScope::OwnerTasks).await;
        assert_eq!(expect_list(&mut rx), Vec::<String>::new());

        let foreign = service.add_task(&v, "not yours", "").await.expect("add");
        manager.publish(&pool, &v, Some(&foreign.id)).await;

        assert!(
            rx.try_recv().is_err(),
            "another owner's mutation must not produce an event"
        );
    }

    #[tokio::test]
    async fn test_single_task_scope_filters_by_task_id() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "single@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let watched = service.add_task(&owner, "watched", "v1").await.expect("add");
        let other = service.add_task(&owner, "other", "").await.expect("add");

        let (_id, mut rx) = open_subscription(
            &manager,
            &pool,
            &owner,
            SubscriptionScope::SingleTask {
                task_id: watched.id.clone(),
            },
        )
        .await;

        match next_message(&mut rx) {
            StreamMessage::TaskSnapshot { task: Some(t) } => assert_eq!(t.id, watched.id),
            other => panic!("expected initial TaskSnapshot, got {:?}", other),
        }

        // A mutation to a different task produces nothing
        service
            .update_task(&owner, &other.id, "other v2", "")
            .await
            .expect("update");
        manager.publish(&pool, &owner, Some(&other.id)).await;
        assert!(rx.try_recv().is_err());

        // Updating the watched task produces a snapshot
        service
            .update_task(&owner, &watched.id, "watched", "v2")
            .await
            .expect("update");
        manager.publish(&pool, &owner, Some(&watched.id)).await;
        match next_message(&mut rx) {
            StreamMessage::TaskSnapshot { task: Some(t) } => assert_eq!(t.description, "v2"),
            other => panic!("expected TaskSnapshot, got {:?}", other),
        }

        // Deleting it snapshots to null
        assert!(service.delete_task(&owner, &watched.id).await.expect("delete"));
        manager.publish(&pool, &owner, Some(&watched.id)).await;
        match next_message(&mut rx) {
            StreamMessage::TaskSnapshot { task: None } => {}
            other => panic!("expected null TaskSnapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bulk_publish_reaches_all_scopes() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "bulk@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let task = service.add_task(&owner, "doomed", "").await.expect("add");

        let (_list_id, mut list_rx) =
            open_subscription(&manager, &pool, &owner, SubscriptionScope::OwnerTasks).await;
        let (_one_id, mut one_rx) = open_subscription(
            &manager,
            &pool,
            &owner,
            SubscriptionScope::SingleTask {
                task_id: task.id.clone(),
            },
        )
        .await;
        let _ = expect_list(&mut list_rx);
        let _ = next_message(&mut one_rx);

        // Account-deletion style bulk change: affected task id unknown
        sqlx::query("DELETE FROM tasks WHERE owner_id = ?")
            .bind(&owner)
            .execute(&pool)
            .await
            .expect("bulk delete");
        manager.publish(&pool, &owner, None).await;

        assert_eq!(expect_list(&mut list_rx), Vec::<String>::new());
        match next_message(&mut one_rx) {
            StreamMessage::TaskSnapshot { task: None } => {}
            other => panic!("expected null TaskSnapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery_and_releases_resources() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "cancel@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let (subscription_id, mut rx) =
            open_subscription(&manager, &pool, &owner, SubscriptionScope::OwnerTasks).await;
        assert_eq!(expect_list(&mut rx), Vec::<String>::new());
        assert_eq!(manager.subscription_count_for_user(&owner).await, 1);

        manager.unregister(&subscription_id).await;
        assert_eq!(manager.subscription_count_for_user(&owner).await, 0);
        assert_eq!(manager.total_subscriptions().await, 0);

        // The manager held the only sender; reaping disconnects the stream
        // so a silent subscriber's socket loop ends instead of lingering
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        let task = service.add_task(&owner, "after close", "").await.expect("add");
        manager.publish(&pool, &owner, Some(&task.id)).await;
        assert!(rx.try_recv().is_err(), "closed subscription receives nothing");

        // Cancellation had no effect on the underlying data
        assert_eq!(service.list_tasks(&owner).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_noop_mutations_emit_no_event() {
        let pool = test_pool().await;
        let u = register_user(&pool, "noop-u@example.com").await;
        let v = register_user(&pool, "noop-v@example.com").await;
        let service = TaskService::new(pool.clone());
        let manager = SubscriptionManager::new();

        let task = service.add_task(&u, "Buy milk", "2%").await.expect("add");

        let (_id, mut rx) =
            open_subscription(&manager, &pool, &u, SubscriptionScope::OwnerTasks).await;
        let _ = expect_list(&mut rx);

        // The handler only publishes when the store reports a change; a
        // non-owner write reports a no-op, so nothing is published
        let outcome = service
            .update_task(&v, &task.id, "hacked", "")
            .await
            .expect("call ok");
        assert!(outcome.is_none());
        let deleted = service.delete_task(&v, &task.id).await.expect("call ok");
        assert!(!deleted);

        assert!(rx.try_recv().is_err(), "no-ops must not emit change events");
    }
}
