//! SQLite row to JSON conversion.
//!
//! SQLite is dynamically typed, so cells are decoded by their runtime
//! storage class rather than the declared column type.

use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Converts one row into a column name to value mapping.
///
/// Duplicate column names keep the last value.
pub fn row_to_map(row: &SqliteRow, columns: &[String]) -> Result<Map<String, Value>, sqlx::Error> {
    let mut map = Map::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate().take(row.len()) {
        map.insert(name.clone(), cell_to_json(row, idx)?);
    }
    Ok(map)
}

/// Decodes a single cell.
///
/// `NULL` → `null`, `INTEGER` → number, `REAL` → number (`null` when not
/// finite), `BLOB` → lowercase hex string, anything else → string.
pub fn cell_to_json(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_string();

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
        "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::String(to_hex(&row.try_get_unchecked::<Vec<u8>, _>(idx)?)),
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_storage_classes() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let row = sqlx::query("SELECT 42 AS i, 1.5 AS r, 'BTCUSDT' AS t, x'00ff' AS b, NULL AS n")
            .fetch_one(&pool)
            .await
            .unwrap();
        let columns: Vec<String> = ["i", "r", "t", "b", "n"].iter().map(|c| c.to_string()).collect();
        let map = row_to_map(&row, &columns).unwrap();

        assert_eq!(map["i"], Value::from(42));
        assert_eq!(map["r"], Value::from(1.5));
        assert_eq!(map["t"], Value::from("BTCUSDT"));
        assert_eq!(map["b"], Value::from("00ff"));
        assert!(map["n"].is_null());
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["i", "r", "t", "b", "n"]);
    }

    #[tokio::test]
    async fn test_declared_type_does_not_matter() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE prices (symbol TEXT, price TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO prices VALUES ('ETHUSDT', 3150)")
            .execute(&pool)
            .await
            .unwrap();

        let row = sqlx::query("SELECT symbol, price FROM prices")
            .fetch_one(&pool)
            .await
            .unwrap();
        // TEXT affinity stores the number as text.
        assert_eq!(cell_to_json(&row, 1).unwrap(), Value::from("3150"));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x0a, 0xbc]), "0abc");
        assert_eq!(to_hex(&[]), "");
    }
}
