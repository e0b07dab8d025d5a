#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::config::{EngineConfig, ValidationPolicy};
    use crate::errors::{Error, ValidationError};
    use crate::events::{DomainEvent, MockDomainEventSink};
    use crate::recompute::HoldingLocks;
    use crate::test_fixtures::InMemoryStore;
    use crate::transactions::{
        NewTransaction, TransactionError, TransactionService, TransactionServiceTrait,
        TransactionType, TransactionUpdate,
    };

    const OWNER: &str = "user-1";

    fn service_with(
        store: &Arc<InMemoryStore>,
        config: EngineConfig,
    ) -> (TransactionService, MockDomainEventSink) {
        let sink = MockDomainEventSink::new();
        let service = TransactionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            HoldingLocks::new(),
            config,
            Arc::new(sink.clone()),
        );
        (service, sink)
    }

    fn setup() -> (Arc<InMemoryStore>, TransactionService, MockDomainEventSink) {
        let store = InMemoryStore::new();
        store.add_portfolio("p1", OWNER);
        let (service, sink) = service_with(&store, EngineConfig::default());
        (store, service, sink)
    }

    fn new_transaction(
        symbol: &str,
        transaction_type: TransactionType,
        quantity: Decimal,
        price: Decimal,
        days_ago: i64,
    ) -> NewTransaction {
        NewTransaction {
            symbol: symbol.to_string(),
            name: None,
            transaction_type,
            quantity,
            price_per_share: price,
            total_amount: None,
            fees: None,
            currency: "USD".to_string(),
            exchange_rate: None,
            transaction_date: Utc::now() - Duration::days(days_ago),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_transaction_creates_holding_and_recomputes() {
        let (store, service, sink) = setup();

        let created = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("aapl", TransactionType::Buy, dec!(10), dec!(150), 5),
            )
            .await
            .unwrap();

        assert_eq!(created.fees, Decimal::ZERO);
        assert_eq!(created.exchange_rate, Decimal::ONE);
        assert_eq!(
            created.average_cost_per_share_at_transaction,
            Some(Decimal::ZERO)
        );

        let holding = store.holding(&created.holding_id).unwrap();
        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(holding.name.as_deref(), Some("AAPL"));
        assert_eq!(holding.current_quantity, dec!(10));
        assert_eq!(holding.average_cost_per_share, dec!(150));

        let events = sink.events();
        assert_eq!(
            events[0],
            DomainEvent::transactions_changed("p1", holding.id.as_str(), vec![created.id.clone()])
        );
        assert_eq!(
            events[1],
            DomainEvent::holding_recomputed("p1", holding.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_second_buy_reuses_holding_and_updates_average() {
        let (store, service, _) = setup();

        let first = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 5),
            )
            .await
            .unwrap();
        let second = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("aapl ", TransactionType::Buy, dec!(5), dec!(160), 2),
            )
            .await
            .unwrap();

        assert_eq!(first.holding_id, second.holding_id);
        assert_eq!(second.average_cost_per_share_at_transaction, Some(dec!(150)));

        let holding = store.holding(&first.holding_id).unwrap();
        assert_eq!(holding.current_quantity, dec!(15));
        assert_eq!(holding.average_cost_per_share, dec!(2300) / dec!(15));
    }

    #[tokio::test]
    async fn test_backdated_buy_reannotates_later_transactions() {
        let (store, service, _) = setup();

        let buy = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(100), 10),
            )
            .await
            .unwrap();
        let sell = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Sell, dec!(5), dec!(120), 2),
            )
            .await
            .unwrap();
        assert_eq!(sell.average_cost_per_share_at_transaction, Some(dec!(100)));

        service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(200), 5),
            )
            .await
            .unwrap();

        assert_eq!(
            store.transaction(&sell.id).unwrap().average_cost_per_share_at_transaction,
            Some(dec!(150))
        );
        let holding = store.holding(&buy.holding_id).unwrap();
        assert_eq!(holding.current_quantity, dec!(15));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_touching_storage() {
        let (store, service, sink) = setup();

        let err = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(0), dec!(150), 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NonPositiveQuantity(_))
        ));

        let err = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(1), dec!(-150), 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NonPositivePrice(_))
        ));

        let err = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("  ", TransactionType::Buy, dec!(1), dec!(150), 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError::MissingSymbol)
        ));

        assert_eq!(store.save_count(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_create_in_foreign_portfolio_is_not_found() {
        let (store, service, _) = setup();
        store.add_portfolio("p2", "someone-else");

        let err = service
            .create_transaction(
                OWNER,
                "p2",
                new_transaction("AAPL", TransactionType::Buy, dec!(1), dec!(10), 1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_strict_total_amount_policy_is_applied() {
        let store = InMemoryStore::new();
        store.add_portfolio("p1", OWNER);
        let (service, _) = service_with(
            &store,
            EngineConfig {
                validation: ValidationPolicy {
                    strict_total_amount: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        );

        let mut input = new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 1);
        input.total_amount = Some(dec!(1400));
        let err = service
            .create_transaction(OWNER, "p1", input.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TotalAmountMismatch { .. })
        ));

        input.total_amount = Some(dec!(1500));
        assert!(service.create_transaction(OWNER, "p1", input).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_patches_fields_and_recomputes() {
        let (store, service, _) = setup();
        let created = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 3),
            )
            .await
            .unwrap();

        let updated = service
            .update_transaction(
                OWNER,
                &created.id,
                TransactionUpdate {
                    price_per_share: Some(dec!(175)),
                    notes: Some(Some("corrected fill".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_per_share, dec!(175));
        assert_eq!(updated.quantity, dec!(10));
        assert_eq!(updated.notes.as_deref(), Some("corrected fill"));
        assert!(updated.updated_at >= created.updated_at);

        let holding = store.holding(&created.holding_id).unwrap();
        assert_eq!(holding.average_cost_per_share, dec!(175));
    }

    #[tokio::test]
    async fn test_update_revalidates_merged_transaction() {
        let (store, service, _) = setup();
        let created = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 3),
            )
            .await
            .unwrap();
        let saves = store.save_count();

        let err = service
            .update_transaction(
                OWNER,
                &created.id,
                TransactionUpdate {
                    transaction_date: Some(Utc::now() + Duration::days(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::FutureDate(_))
        ));
        assert_eq!(store.save_count(), saves);
        assert_eq!(
            store.transaction(&created.id).unwrap().transaction_date,
            created.transaction_date
        );
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let (_, service, _) = setup();

        let err = service
            .update_transaction(OWNER, "any", TransactionUpdate::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transaction(TransactionError::EmptyUpdate(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_transaction_is_not_found() {
        let (store, service, _) = setup();
        store.add_portfolio("p2", "someone-else");
        let (foreign_service, _) = service_with(&store, EngineConfig::default());
        let foreign = foreign_service
            .create_transaction(
                "someone-else",
                "p2",
                new_transaction("AAPL", TransactionType::Buy, dec!(1), dec!(10), 1),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.get_transaction(OWNER, &foreign.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.delete_transaction(OWNER, &foreign.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(store.transaction(&foreign.id).is_some());
    }

    #[tokio::test]
    async fn test_deleting_last_transaction_removes_empty_holding() {
        let (store, service, sink) = setup();
        let created = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 3),
            )
            .await
            .unwrap();
        sink.clear();

        let deletion = service.delete_transaction(OWNER, &created.id).await.unwrap();

        assert!(deletion.holding_deleted);
        assert!(store.holding(&created.holding_id).is_none());
        assert_eq!(store.transaction_count(&created.holding_id), 0);
        assert!(sink
            .events()
            .contains(&DomainEvent::holding_deleted("p1", created.holding_id.as_str())));
    }

    #[tokio::test]
    async fn test_zero_quantity_with_offsetting_transactions_is_kept() {
        let (store, service, _) = setup();
        let buy = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 5),
            )
            .await
            .unwrap();
        service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Sell, dec!(10), dec!(160), 3),
            )
            .await
            .unwrap();
        let dividend = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Dividend, dec!(10), dec!(1), 1),
            )
            .await
            .unwrap();

        let deletion = service
            .delete_transaction(OWNER, &dividend.id)
            .await
            .unwrap();

        assert!(!deletion.holding_deleted);
        let holding = store.holding(&buy.holding_id).unwrap();
        assert_eq!(holding.current_quantity, Decimal::ZERO);
        assert_eq!(store.transaction_count(&holding.id), 2);
    }

    #[tokio::test]
    async fn test_cleanup_can_be_disabled() {
        let store = InMemoryStore::new();
        store.add_portfolio("p1", OWNER);
        let (service, _) = service_with(
            &store,
            EngineConfig {
                delete_empty_holdings: false,
                ..Default::default()
            },
        );
        let created = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(150), 3),
            )
            .await
            .unwrap();

        let deletion = service.delete_transaction(OWNER, &created.id).await.unwrap();

        assert!(!deletion.holding_deleted);
        let holding = store.holding(&created.holding_id).unwrap();
        assert_eq!(holding.current_quantity, Decimal::ZERO);
        assert_eq!(holding.average_cost_per_share, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_delete_recomputes_remaining_history() {
        let (store, service, _) = setup();
        let first = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(100), 5),
            )
            .await
            .unwrap();
        let second = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(10), dec!(200), 3),
            )
            .await
            .unwrap();

        service.delete_transaction(OWNER, &first.id).await.unwrap();

        let holding = store.holding(&first.holding_id).unwrap();
        assert_eq!(holding.current_quantity, dec!(10));
        assert_eq!(holding.average_cost_per_share, dec!(200));
        assert_eq!(
            store.transaction(&second.id).unwrap().average_cost_per_share_at_transaction,
            Some(Decimal::ZERO)
        );
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_newest_first() {
        let (store, service, _) = setup();
        store.add_portfolio("p2", "someone-else");
        let older = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(1), dec!(10), 5),
            )
            .await
            .unwrap();
        let newer = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("MSFT", TransactionType::Buy, dec!(1), dec!(20), 1),
            )
            .await
            .unwrap();

        let listed = service
            .list_portfolio_transactions(OWNER, "p1", 0, 0)
            .unwrap();
        let ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

        let holdings = service.list_holdings(OWNER, "p1").unwrap();
        assert_eq!(holdings.len(), 2);

        assert!(matches!(
            service.list_holdings(OWNER, "p2"),
            Err(Error::NotFound(_))
        ));
        assert!(service.get_holding(OWNER, &older.holding_id).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_creates_on_one_symbol_share_a_holding() {
        let (store, service, _) = setup();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_transaction(
                        OWNER,
                        "p1",
                        new_transaction("NVDA", TransactionType::Buy, dec!(1), dec!(100) + Decimal::from(i), 1),
                    )
                    .await
            }));
        }
        let mut holding_ids = Vec::new();
        for handle in handles {
            holding_ids.push(handle.await.unwrap().unwrap().holding_id);
        }
        holding_ids.dedup();
        assert_eq!(holding_ids.len(), 1);

        let holding = store.holding(&holding_ids[0]).unwrap();
        assert_eq!(holding.current_quantity, dec!(8));
        assert_eq!(store.transaction_count(&holding.id), 8);
    }

    #[tokio::test]
    async fn test_create_rejects_amounts_outside_decimal_range() {
        let (store, service, sink) = setup();
        let huge = Decimal::from(1_000_000_000_000_000i64);

        let err = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, huge, huge, 1),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::AmountOutOfRange(_))
        ));
        assert!(err.is_client_error());
        assert_eq!(store.save_count(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_create_whose_total_overflows_leaves_holding_unchanged() {
        let (store, service, _) = setup();
        let quantity = Decimal::from(100_000_000_000_000i64);
        let price = Decimal::from(500_000_000_000_000i64);
        let first = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, quantity, price, 2),
            )
            .await
            .unwrap();

        let err = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, quantity, price, 1),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::AmountOutOfRange(_))
        ));
        assert_eq!(store.transaction_count(&first.holding_id), 1);
        assert_eq!(
            store.holding(&first.holding_id).unwrap().current_quantity,
            quantity
        );
    }

    #[tokio::test]
    async fn test_create_recovers_when_its_holding_is_cleaned_up_meanwhile() {
        let store = InMemoryStore::new();
        store.add_portfolio("p1", OWNER);
        let locks = HoldingLocks::new();
        let service = Arc::new(TransactionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            locks.clone(),
            EngineConfig::default(),
            Arc::new(MockDomainEventSink::new()),
        ));
        let only = service
            .create_transaction(
                OWNER,
                "p1",
                new_transaction("AAPL", TransactionType::Buy, dec!(5), dec!(100), 3),
            )
            .await
            .unwrap();

        // Queue the delete ahead of the create on the holding's lock.
        let guard = locks.acquire(&only.holding_id).await;
        let deleting = {
            let service = service.clone();
            let transaction_id = only.id.clone();
            tokio::spawn(async move { service.delete_transaction(OWNER, &transaction_id).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let creating = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_transaction(
                        OWNER,
                        "p1",
                        new_transaction("AAPL", TransactionType::Buy, dec!(2), dec!(120), 1),
                    )
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(guard);

        let deletion = deleting.await.unwrap().unwrap();
        let created = creating.await.unwrap().unwrap();

        assert!(deletion.holding_deleted);
        assert!(store.holding(&only.holding_id).is_none());
        assert_ne!(created.holding_id, only.holding_id);
        let holding = store.holding(&created.holding_id).unwrap();
        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(holding.current_quantity, dec!(2));
        assert_eq!(holding.average_cost_per_share, dec!(120));
    }
}
