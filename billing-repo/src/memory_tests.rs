//! In-memory repository tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use billing_types::{
        Invoice, InvoiceFilter, InvoiceId, InvoiceRepository, InvoiceStatus, LineItem,
        PaymentMethod, RepoError, Transaction, TransactionId, TransactionPaymentMethod,
        TransactionRepository, TransactionStatus, TransactionType, UserId,
    };

    use crate::{MEMORY_URL, MemoryRepo, Repo, build_repo};

    fn invoice(user_id: UserId, hash: &str) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            user_id,
            public_hash: hash.to_string(),
            invoice_number: "INV-1".into(),
            po_number: String::new(),
            currency: "USD".into(),
            due_date: None,
            message: String::new(),
            bill_to: Default::default(),
            pay_to: Default::default(),
            line_items: vec![LineItem {
                quantity: 1,
                price: 100,
                ..Default::default()
            }],
            payment_methods: vec![PaymentMethod::Card],
            tax_rate: String::new(),
            amount_due: 100,
            amount_paid: 0,
            status: InvoiceStatus::Pending,
            version: 1,
            created_at: Utc::now(),
        }
    }

    fn transaction(user_id: UserId) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            user_id,
            invoice_id: None,
            transaction_type: TransactionType::Sale,
            amount_captured: 100,
            card_type: Default::default(),
            status: TransactionStatus::Approved,
            payment_method: TransactionPaymentMethod::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_invoice() {
        let repo = MemoryRepo::new();
        let created = InvoiceRepository::create(&repo, invoice(UserId::new(), "h1"))
            .await
            .unwrap();

        let by_id = InvoiceRepository::get_by_id(&repo, created.id).await.unwrap();
        let by_hash = repo.get_by_public_hash("h1").await.unwrap();

        assert_eq!(by_id, Some(created.clone()));
        assert_eq!(by_hash, Some(created));
        assert_eq!(repo.get_by_public_hash("h2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_hash() {
        let repo = MemoryRepo::new();
        let user_id = UserId::new();
        InvoiceRepository::create(&repo, invoice(user_id, "same"))
            .await
            .unwrap();

        let result = InvoiceRepository::create(&repo, invoice(user_id, "same")).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_orders_newest_first_and_pages() {
        let repo = MemoryRepo::new();
        let user_id = UserId::new();
        let now = Utc::now();

        for (i, hash) in ["a", "b", "c"].into_iter().enumerate() {
            let mut inv = invoice(user_id, hash);
            inv.created_at = now + Duration::seconds(i as i64);
            InvoiceRepository::create(&repo, inv).await.unwrap();
        }
        InvoiceRepository::create(&repo, invoice(UserId::new(), "other"))
            .await
            .unwrap();

        let filter = InvoiceFilter {
            user_id: Some(user_id),
            offset: 1,
            limit: 1,
            ..Default::default()
        };

        let page = repo.get(&filter).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].public_hash, "b");

        assert_eq!(repo.get_count(&filter).await.unwrap(), 3);

        let everything = repo.get(&InvoiceFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive() {
        let repo = MemoryRepo::new();
        let inv = InvoiceRepository::create(&repo, invoice(UserId::new(), "h"))
            .await
            .unwrap();

        let exact = InvoiceFilter {
            created_at_start: Some(inv.created_at),
            created_at_end: Some(inv.created_at),
            ..Default::default()
        };
        assert_eq!(repo.get_count(&exact).await.unwrap(), 1);

        let after = InvoiceFilter {
            created_at_start: Some(inv.created_at + Duration::milliseconds(1)),
            ..Default::default()
        };
        assert_eq!(repo.get_count(&after).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_compare_and_swap() {
        let repo = MemoryRepo::new();
        let inv = InvoiceRepository::create(&repo, invoice(UserId::new(), "h"))
            .await
            .unwrap();

        let mut paid = inv.clone();
        paid.amount_due = 0;
        paid.amount_paid = 100;
        paid.status = InvoiceStatus::Paid;

        let stored = repo.update(paid.clone(), inv.version).await.unwrap();
        assert_eq!(stored.version, 2);

        // A second writer holding the old version loses.
        let stale = repo.update(paid, inv.version).await;
        assert!(matches!(stale, Err(RepoError::Conflict(_))));

        let missing = repo.update(invoice(UserId::new(), "x"), 1).await;
        assert!(matches!(missing, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_invoice() {
        let repo = MemoryRepo::new();
        let inv = InvoiceRepository::create(&repo, invoice(UserId::new(), "h"))
            .await
            .unwrap();

        repo.delete(inv.id).await.unwrap();

        assert!(matches!(repo.delete(inv.id).await, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_transactions() {
        let repo = MemoryRepo::new();
        let tx = TransactionRepository::create(&repo, transaction(UserId::new()))
            .await
            .unwrap();

        let found = TransactionRepository::get_by_id(&repo, tx.id).await.unwrap();
        assert_eq!(found, Some(tx.clone()));

        let duplicate = TransactionRepository::create(&repo, tx).await;
        assert!(matches!(duplicate, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_build_repo_selects_adapter() {
        let repo = build_repo(MEMORY_URL).await.unwrap();
        assert!(matches!(repo, Repo::Memory(_)));

        assert!(build_repo("mysql://localhost/billing").await.is_err());
    }
}
