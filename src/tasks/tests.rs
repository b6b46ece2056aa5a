#[cfg(test)]
mod tests {
    use crate::auth::credentials::CredentialService;
    use crate::common::migrations::run_migrations;
    use crate::tasks::service::TaskService;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

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

    #[tokio::test]
    async fn test_add_and_list_tasks() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "owner@example.com").await;
        let service = TaskService::new(pool);

        let task = service
            .add_task(&owner, "Buy groceries", "Milk, eggs, bread")
            .await
            .expect("add should succeed");

        assert!(task.id.starts_with("T_"));
        assert_eq!(task.owner_id, owner);
        assert_eq!(task.title, "Buy groceries");

        let tasks = service.list_tasks(&owner).await.expect("list should succeed");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task.id);
    }

    #[tokio::test]
    async fn test_list_is_in_commit_order() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "order@example.com").await;
        let service = TaskService::new(pool);

        let first = service.add_task(&owner, "first", "").await.expect("add");
        let second = service.add_task(&owner, "second", "").await.expect("add");
        let third = service.add_task(&owner, "third", "").await.expect("add");

        let ids: Vec<String> = service
            .list_tasks(&owner)
            .await
            .expect("list")
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[tokio::test]
    async fn test_owner_isolation() {
        let pool = test_pool().await;
        let u = register_user(&pool, "u@example.com").await;
        let v = register_user(&pool, "v@example.com").await;
        let service = TaskService::new(pool);

        let task = service.add_task(&u, "private", "").await.expect("add");

        let v_tasks = service.list_tasks(&v).await.expect("list");
        assert!(v_tasks.is_empty(), "another user's list must never leak tasks");

        // Foreign get does not reveal existence
        let seen = service.get_task(&v, &task.id).await.expect("get");
        assert!(seen.is_none());
        let missing = service.get_task(&v, "T_NOPE00").await.expect("get");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_non_owner_update_is_silent_noop() {
        let pool = test_pool().await;
        let u = register_user(&pool, "u2@example.com").await;
        let v = register_user(&pool, "v2@example.com").await;
        let service = TaskService::new(pool);

        let task = service.add_task(&u, "Buy milk", "2%").await.expect("add");

        let outcome = service
            .update_task(&v, &task.id, "hacked", "")
            .await
            .expect("the call itself must not error");
        assert!(outcome.is_none(), "non-owner update must be dropped");

        let unchanged = service
            .get_task(&u, &task.id)
            .await
            .expect("get")
            .expect("task should still exist");
        assert_eq!(unchanged.title, "Buy milk");
        assert_eq!(unchanged.description, "2%");
    }

    #[tokio::test]
    async fn test_non_owner_delete_is_silent_noop() {
        let pool = test_pool().await;
        let u = register_user(&pool, "u3@example.com").await;
        let v = register_user(&pool, "v3@example.com").await;
        let service = TaskService::new(pool);

        let task = service.add_task(&u, "keep me", "").await.expect("add");

        let deleted = service
            .delete_task(&v, &task.id)
            .await
            .expect("the call itself must not error");
        assert!(!deleted);

        assert!(service.get_task(&u, &task.id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let pool = test_pool().await;
        let owner = register_user(&pool, "edit@example.com").await;
        let service = TaskService::new(pool);

        let task = service.add_task(&owner, "draft", "old").await.expect("add");
        let updated = service
            .update_task(&owner, &task.id, "final", "new")
            .await
            .expect("update")
            .expect("owner update should apply");

        assert_eq!(updated.id, task.id);
        assert_eq!(updated.owner_id, owner);
        assert_eq!(updated.title, "final");
        assert_eq!(updated.description, "new");
    }

    #[tokio::test]
    async fn test_store_accepts_empty_title() {
        // Non-emptiness is a client concern, not a store invariant
        let pool = test_pool().await;
        let owner = register_user(&pool, "empty@example.com").await;
        let service = TaskService::new(pool);

        let task = service.add_task(&owner, "", "").await.expect("add");
        assert_eq!(task.title, "");
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        // register -> add -> foreign update no-op -> owner delete -> empty
        let pool = test_pool().await;
        let credentials = CredentialService::new(pool.clone());
        let u1 = credentials
            .register("a@x.com", "pw123456")
            .await
            .expect("register")
            .id;
        let u2 = register_user(&pool, "b@x.com").await;
        let service = TaskService::new(pool);

        let t1 = service.add_task(&u1, "Buy milk", "2%").await.expect("add");
        assert_eq!(t1.owner_id, u1);

        let outcome = service
            .update_task(&u2, &t1.id, "hacked", "")
            .await
            .expect("call ok");
        assert!(outcome.is_none());
        assert_eq!(
            service
                .get_task(&u1, &t1.id)
                .await
                .expect("get")
                .expect("present")
                .title,
            "Buy milk"
        );

        assert!(service.delete_task(&u1, &t1.id).await.expect("delete"));
        assert!(service.list_tasks(&u1).await.expect("list").is_empty());
    }
}
