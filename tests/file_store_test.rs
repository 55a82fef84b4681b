mod common;

use anyhow::Result;
use common::{entry, file_store, lunch_and_salary};
use rust_decimal_macros::dec;
use tally::{LedgerStore, UpdatableLedgerStore};

const HEADER: &str = "Date,Category,Description,Type,Amount";

#[tokio::test]
async fn test_missing_file_is_empty_ledger() -> Result<()> {
    let (store, _temp) = file_store()?;

    assert!(store.list_all().await?.is_empty());

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(0));
    assert_eq!(report.net_balance, dec!(0));
    assert!(!store.path().exists(), "reads must not create the file");

    Ok(())
}

#[tokio::test]
async fn test_save_creates_file_with_header() -> Result<()> {
    let (store, _temp) = file_store()?;

    let saved = store.save(entry("Food", "Lunch", "expense", "12.5")).await?;
    assert_eq!(saved.transaction_type, "Expense");
    assert_eq!(saved.amount, "12.50");

    let contents = std::fs::read_to_string(store.path())?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], HEADER);
    assert!(lines[1].ends_with(",Food,Lunch,Expense,12.50"));

    Ok(())
}

#[tokio::test]
async fn test_list_preserves_insertion_order() -> Result<()> {
    let (store, _temp) = file_store()?;
    let entries = lunch_and_salary();

    for e in &entries {
        store.save(e.clone()).await?;
    }

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 2);
    for (row, e) in rows.iter().zip(&entries) {
        assert_eq!(row.to_entry().as_ref(), Some(e));
    }

    // Listing twice without a mutation gives the same result
    assert_eq!(store.list_all().await?, rows);

    Ok(())
}

#[tokio::test]
async fn test_lunch_and_salary_balance() -> Result<()> {
    let (store, _temp) = file_store()?;
    for e in lunch_and_salary() {
        store.save(e).await?;
    }

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(1000.00));
    assert_eq!(report.total_expense, dec!(12.50));
    assert_eq!(report.net_balance, dec!(987.50));
    assert_eq!(report.skipped, 0);

    Ok(())
}

#[tokio::test]
async fn test_malformed_amount_is_skipped() -> Result<()> {
    let (store, _temp) = file_store()?;
    std::fs::write(
        store.path(),
        format!("{HEADER}\n2024-01-01,Food,Lunch,Expense,abc\n2024-01-02,Job,Bonus,Income,50.00\n"),
    )?;

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(50.00));
    assert_eq!(report.net_balance, dec!(50.00));
    assert_eq!(report.skipped, 1);

    // Listing still returns the malformed row so positions stay aligned
    assert_eq!(store.list_all().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_tolerates_spaced_header_and_blank_lines() -> Result<()> {
    let (store, _temp) = file_store()?;
    std::fs::write(
        store.path(),
        "Date, Category, Description, Type, Amount\n\n2024-01-01,Job,Salary,income ,100.00   \n\n",
    )?;

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, "Job");

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(100.00));

    Ok(())
}

#[tokio::test]
async fn test_save_does_not_introduce_blank_lines() -> Result<()> {
    let (store, _temp) = file_store()?;
    // Existing content without a trailing newline
    std::fs::write(store.path(), format!("{HEADER}\n2024-01-01,Job,Salary,Income,100.00"))?;

    store.save(entry("Food", "Lunch", "Expense", "10")).await?;

    let contents = std::fs::read_to_string(store.path())?;
    assert!(contents.starts_with(&format!("{HEADER}\n2024-01-01,Job,Salary,Income,100.00\n")));
    assert!(!contents.contains("\n\n"));
    assert_eq!(contents.lines().count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_update_replaces_only_target_position() -> Result<()> {
    let (store, _temp) = file_store()?;
    for e in lunch_and_salary() {
        store.save(e).await?;
    }
    store.save(entry("Home", "Rent", "Expense", "500")).await?;

    let replacement = entry("Food", "Dinner", "EXPENSE", "30.00");
    assert!(store.update(1, replacement.clone()).await?);

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].description, "Lunch");
    assert_eq!(rows[1].to_entry().as_ref(), Some(&replacement));
    assert_eq!(rows[2].description, "Rent");

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(0));
    assert_eq!(report.total_expense, dec!(542.50));

    Ok(())
}

#[tokio::test]
async fn test_update_out_of_range_leaves_file_untouched() -> Result<()> {
    let (store, _temp) = file_store()?;
    for e in lunch_and_salary() {
        store.save(e).await?;
    }
    let before = std::fs::read(store.path())?;

    assert!(!store.update(2, entry("X", "Y", "Income", "1")).await?);
    assert!(!store.update(usize::MAX, entry("X", "Y", "Income", "1")).await?);

    assert_eq!(std::fs::read(store.path())?, before);

    Ok(())
}

#[tokio::test]
async fn test_delete_keeps_relative_order() -> Result<()> {
    let (store, _temp) = file_store()?;
    for description in ["First", "Second", "Third", "Fourth"] {
        store.save(entry("Misc", description, "Expense", "1.00")).await?;
    }

    assert!(store.delete(1).await?);

    let descriptions: Vec<String> = store
        .list_all()
        .await?
        .into_iter()
        .map(|row| row.description)
        .collect();
    assert_eq!(descriptions, vec!["First", "Third", "Fourth"]);

    let contents = std::fs::read_to_string(store.path())?;
    assert!(contents.starts_with(HEADER));

    Ok(())
}

#[tokio::test]
async fn test_delete_out_of_range_is_noop() -> Result<()> {
    let (store, _temp) = file_store()?;
    for description in ["First", "Second", "Third"] {
        store.save(entry("Misc", description, "Income", "2.00")).await?;
    }
    let before = std::fs::read(store.path())?;

    assert!(!store.delete(5).await?);

    assert_eq!(std::fs::read(store.path())?, before);
    assert_eq!(store.list_all().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_delete_on_missing_file() -> Result<()> {
    let (store, _temp) = file_store()?;

    assert!(!store.delete(0).await?);
    assert!(!store.path().exists());

    Ok(())
}

#[tokio::test]
async fn test_rewrite_leaves_no_temporary_file() -> Result<()> {
    let (store, temp) = file_store()?;
    for e in lunch_and_salary() {
        store.save(e).await?;
    }

    assert!(store.delete(0).await?);

    let names: Vec<String> = std::fs::read_dir(temp.path())?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, vec!["transactions.csv"]);

    Ok(())
}

#[tokio::test]
async fn test_description_with_comma_round_trips() -> Result<()> {
    let (store, _temp) = file_store()?;
    store.save(entry("Food", "Lunch, with tip", "Expense", "15.00")).await?;

    let rows = store.list_all().await?;
    assert_eq!(rows[0].description, "Lunch, with tip");
    assert_eq!(store.compute_balance().await?.total_expense, dec!(15.00));

    Ok(())
}

#[tokio::test]
async fn test_interleaved_writes_are_serialized() -> Result<()> {
    let (store, _temp) = file_store()?;
    for e in lunch_and_salary() {
        store.save(e).await?;
    }

    let (a, b, c, d) = tokio::join!(
        store.save(entry("Misc", "A", "Income", "1.00")),
        store.save(entry("Misc", "B", "Income", "1.00")),
        store.delete(0),
        store.update(0, entry("Job", "Salary", "Income", "2000.00")),
    );
    a?;
    b?;
    assert!(c?);
    assert!(d?);

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.to_entry().is_some()));

    let contents = std::fs::read_to_string(store.path())?;
    assert_eq!(contents.lines().next(), Some(HEADER));
    assert!(!contents.contains("\n\n"));

    Ok(())
}

#[tokio::test]
async fn test_overflowing_rows_are_skipped() -> Result<()> {
    let (store, _temp) = file_store()?;
    let max = "79228162514264337593543950335";
    std::fs::write(
        store.path(),
        format!("{HEADER}\n2024-01-01,A,B,Income,{max}\n2024-01-01,A,B,Income,{max}\n2024-01-02,Food,Lunch,Expense,12.50\n"),
    )?;

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, rust_decimal::Decimal::MAX);
    assert_eq!(report.total_expense, dec!(12.50));
    assert_eq!(report.skipped, 1);

    Ok(())
}

#[tokio::test]
async fn test_save_onto_blank_file_writes_header() -> Result<()> {
    let (store, _temp) = file_store()?;
    std::fs::write(store.path(), "\n  \n")?;

    store.save(entry("Food", "Lunch", "Expense", "12.50")).await?;

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "Lunch");
    assert_eq!(store.compute_balance().await?.total_expense, dec!(12.50));

    Ok(())
}

#[tokio::test]
async fn test_invalid_utf8_row_degrades_gracefully() -> Result<()> {
    let (store, _temp) = file_store()?;
    let mut contents = format!("{HEADER}\n").into_bytes();
    contents.extend_from_slice(b"2024-01-01,Food,Caf\xff,Expense,3.00\n");
    contents.extend_from_slice(b"2024-01-02,Job,Salary,Income,1000.00\n");
    std::fs::write(store.path(), contents)?;

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].description, "Salary");

    let report = store.compute_balance().await?;
    assert_eq!(report.total_income, dec!(1000.00));
    assert_eq!(report.total_expense, dec!(0));
    assert_eq!(report.skipped, 1);

    // Mutations still work on the readable rows
    assert!(store.delete(1).await?);
    assert_eq!(store.list_all().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_append_reports_position_under_concurrency() -> Result<()> {
    let (store, _temp) = file_store()?;
    store.save(entry("Job", "Salary", "Income", "1000.00")).await?;

    let (a, b, c) = tokio::join!(
        store.append(entry("Misc", "A", "Expense", "1.00")),
        store.delete(0),
        store.append(entry("Misc", "C", "Expense", "3.00")),
    );
    let (a, b, c) = (a?, b?, c?);
    assert!(b);

    // Writers run in arrival order: A lands after Salary, the delete removes
    // Salary, then C lands after A
    assert_eq!(a.0, 1);
    assert_eq!(c.0, 1);

    let rows = store.list_all().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].description, "A");
    assert_eq!(rows[c.0], c.1);

    Ok(())
}
