mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{raw, record, test_service, StandardAccounts, StandardCategories};
use moneymine::application::{AppError, TransactionFilter};
use moneymine::domain::{TransactionType, TransactionUpdate};

#[tokio::test]
async fn test_create_and_resolve_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let by_name = service.get_account("Checking").await?;
    let by_code = service.get_account(&accounts.checking.code).await?;
    assert_eq!(by_name.code, by_code.code);
    assert_eq!(by_name.description.as_deref(), Some("Main account"));

    let listed = service.list_accounts().await?;
    let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Checking", "Savings"]);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_account_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    let result = service.create_account("Checking".into(), None).await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_account_balance_and_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    record(&service, "Checking", "2024-01-05", 12000, "Salary").await?;
    let rent = record(&service, "Checking", "2024-01-06", -4500, "Rent").await?;

    let balance = service.account_balance("Checking").await?;
    assert_eq!(balance.balance, 7500);
    assert_eq!(balance.transaction_count, 2);

    // Refused while transactions remain
    let result = service.delete_account("Checking").await;
    assert!(matches!(
        result,
        Err(AppError::AccountInUse { count: 2, .. })
    ));

    // Empty accounts can go
    let deleted = service.delete_account("Savings").await?;
    assert_eq!(deleted.name, "Savings");
    assert!(matches!(
        service.get_account("Savings").await,
        Err(AppError::AccountNotFound(_))
    ));

    service.delete_transaction(&rent.code).await?;
    let balance = service.account_balance("Checking").await?;
    assert_eq!(balance.balance, 12000);

    Ok(())
}

#[tokio::test]
async fn test_category_tree() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let categories = StandardCategories::create(&service).await?;

    let tree = service.category_tree().await?;
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].code, categories.food.code);
    assert_eq!(tree[0].children.len(), 2);
    assert_eq!(tree[0].children[0].name, "Groceries");
    assert_eq!(tree[0].children[1].name, "Restaurants");
    assert_eq!(tree[1].name, "Home");
    assert!(tree[1].children.is_empty());

    let groceries = service.get_category(&categories.groceries.code).await?;
    assert_eq!(
        groceries.parent_category_code.as_deref(),
        Some(categories.food.code.as_str())
    );

    Ok(())
}

#[tokio::test]
async fn test_category_with_unknown_parent_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .create_category("Orphan".into(), Some("missing".into()))
        .await;
    assert!(matches!(result, Err(AppError::CategoryNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_category_rules() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;
    let categories = StandardCategories::create(&service).await?;

    let result = service.delete_category(&categories.food.code).await;
    assert!(matches!(
        result,
        Err(AppError::CategoryHasChildren { count: 2, .. })
    ));

    let mut groceries = raw("Checking", "2024-03-01", -1000, "Bakery");
    groceries.category_code = Some(categories.groceries.code.clone());
    service.record_transaction(groceries).await?;

    let result = service.delete_category(&categories.groceries.code).await;
    assert!(matches!(
        result,
        Err(AppError::CategoryInUse { count: 1, .. })
    ));

    service.delete_category(&categories.restaurants.code).await?;
    service.delete_category(&categories.home.code).await?;
    assert_eq!(service.list_categories().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_record_transaction_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    let result = service
        .record_transaction(raw("Checking", "2024-13-01", 100, "Bad month"))
        .await;
    assert!(matches!(result, Err(AppError::InvalidDate(_))));

    let result = service
        .record_transaction(raw("Checking", "01/03/2024", 100, "Wrong layout"))
        .await;
    assert!(matches!(result, Err(AppError::InvalidDate(_))));

    let result = service
        .record_transaction(raw("Nowhere", "2024-03-01", 100, "No account"))
        .await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    let mut unknown_category = raw("Checking", "2024-03-01", 100, "No category");
    unknown_category.category_code = Some("missing".into());
    let result = service.record_transaction(unknown_category).await;
    assert!(matches!(result, Err(AppError::CategoryNotFound(_))));

    assert!(service
        .list_transactions(TransactionFilter::default())
        .await?
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transaction_type_defaults_from_sign() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    let deposit = record(&service, "Checking", "2024-03-01", 100, "In").await?;
    let withdrawal = record(&service, "Checking", "2024-03-01", -100, "Out").await?;
    assert_eq!(deposit.kind, TransactionType::Deposit);
    assert_eq!(withdrawal.kind, TransactionType::Withdrawal);

    let mut transfer = raw("Checking", "2024-03-02", -2500, "To savings");
    transfer.kind = Some(TransactionType::Transfer);
    let transfer = service.record_transaction(transfer).await?;

    let stored = service.get_transaction(&transfer.code).await?;
    assert_eq!(stored.kind, TransactionType::Transfer);
    assert_eq!(stored.value, -2500);
    assert_eq!(stored.date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

    Ok(())
}

#[tokio::test]
async fn test_update_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;
    let categories = StandardCategories::create(&service).await?;

    let original = record(&service, "Checking", "2024-03-01", -1000, "Coffee").await?;

    let updated = service
        .update_transaction(
            &original.code,
            TransactionUpdate {
                description: Some("Lunch".into()),
                category_code: Some(Some(categories.restaurants.code.clone())),
                value: Some(-2500),
                date: NaiveDate::from_ymd_opt(2024, 3, 4),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.description, "Lunch");
    assert_eq!(updated.value, -2500);

    let stored = service.get_transaction(&original.code).await?;
    assert_eq!(stored, updated);
    assert_eq!(stored.account_code, accounts.checking.code);
    assert_eq!(
        stored.category_code.as_deref(),
        Some(categories.restaurants.code.as_str())
    );

    let cleared = service
        .update_transaction(
            &original.code,
            TransactionUpdate {
                category_code: Some(None),
                ..Default::default()
            },
        )
        .await?;
    assert!(cleared.category_code.is_none());

    let result = service
        .update_transaction(
            &original.code,
            TransactionUpdate {
                category_code: Some(Some("missing".into())),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::CategoryNotFound(_))));

    let result = service
        .update_transaction("missing", TransactionUpdate::default())
        .await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_list_transactions_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardAccounts::create(&service).await?;

    record(&service, "Checking", "2024-03-10", 100, "a").await?;
    record(&service, "Savings", "2024-03-01", 200, "b").await?;
    record(&service, "Checking", "2024-02-01", 300, "c").await?;
    record(&service, "Checking", "2024-03-20", 400, "d").await?;

    let checking = service
        .list_transactions(TransactionFilter {
            accounts: vec!["Checking".into()],
            ..Default::default()
        })
        .await?;
    let descriptions: Vec<&str> = checking.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, vec!["a", "c", "d"]);

    let march = service
        .list_transactions(TransactionFilter {
            from_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            to_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            ..Default::default()
        })
        .await?;
    let descriptions: Vec<&str> = march.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, vec!["a", "b"]);

    let limited = service
        .list_transactions(TransactionFilter {
            limit: Some(2),
            ..Default::default()
        })
        .await?;
    assert_eq!(limited.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_update_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let renamed = service
        .update_account("Checking", Some("Main".into()), None)
        .await?;
    assert_eq!(renamed.code, accounts.checking.code);
    assert_eq!(renamed.description.as_deref(), Some("Main account"));

    let stored = service.get_account("Main").await?;
    assert_eq!(stored.code, accounts.checking.code);
    assert!(matches!(
        service.get_account("Checking").await,
        Err(AppError::AccountNotFound(_))
    ));

    // Keeping the same name is fine, taking another account's name is not
    service
        .update_account("Main", Some("Main".into()), None)
        .await?;
    let result = service
        .update_account("Main", Some("Savings".into()), None)
        .await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(_))));

    let cleared = service.update_account("Main", None, Some(None)).await?;
    assert!(cleared.description.is_none());
    let described = service
        .update_account(&accounts.savings.code, None, Some(Some("Emergency fund".into())))
        .await?;
    assert_eq!(described.description.as_deref(), Some("Emergency fund"));
    assert_eq!(
        service.get_account("Savings").await?.description.as_deref(),
        Some("Emergency fund")
    );

    Ok(())
}

#[tokio::test]
async fn test_update_category_rename_and_move() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let categories = StandardCategories::create(&service).await?;

    let moved = service
        .update_category(
            &categories.restaurants.code,
            Some("Eating out".into()),
            Some(Some(categories.home.code.clone())),
        )
        .await?;
    assert_eq!(moved.name, "Eating out");

    let tree = service.category_tree().await?;
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[1].children[0].name, "Eating out");

    service
        .update_category(&categories.groceries.code, None, Some(None))
        .await?;
    let groceries = service.get_category(&categories.groceries.code).await?;
    assert!(groceries.parent_category_code.is_none());
    assert_eq!(service.category_tree().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_update_category_rejects_cycles() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let categories = StandardCategories::create(&service).await?;

    let below_child = service
        .update_category(
            &categories.food.code,
            None,
            Some(Some(categories.groceries.code.clone())),
        )
        .await;
    assert!(matches!(
        below_child,
        Err(AppError::OperationNotPermitted(_))
    ));

    let below_itself = service
        .update_category(
            &categories.home.code,
            None,
            Some(Some(categories.home.code.clone())),
        )
        .await;
    assert!(matches!(
        below_itself,
        Err(AppError::OperationNotPermitted(_))
    ));

    let unknown_parent = service
        .update_category(&categories.home.code, None, Some(Some("missing".into())))
        .await;
    assert!(matches!(unknown_parent, Err(AppError::CategoryNotFound(_))));

    // Nothing changed
    let food = service.get_category(&categories.food.code).await?;
    assert!(food.parent_category_code.is_none());

    Ok(())
}
