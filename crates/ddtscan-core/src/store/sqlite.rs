//! SQLite-backed delivery store.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{DeliveryStore, Gap, OverviewRow, Result, SummaryRow};
use crate::error::StoreError;
use crate::models::{DeliveryRecord, DiscardRecord, WarningKind};

/// SQLite store with autocommit: every write commits independently.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Open(format!("{}: {e}", path.display())))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS delivery (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_number INTEGER NOT NULL,
                document_genre TEXT NOT NULL,
                document_date TEXT NOT NULL,
                company_name TEXT,
                delivery_city TEXT,
                quantity INTEGER NOT NULL,
                delivery_date TEXT,
                vehicle TEXT NOT NULL,
                vehicle_driver TEXT,
                distance REAL,
                document_source TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                recording_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS delivery_discard (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_number INTEGER,
                document_genre TEXT,
                document_date TEXT,
                company_name TEXT,
                delivery_city TEXT,
                quantity INTEGER,
                delivery_date TEXT,
                vehicle TEXT,
                vehicle_driver TEXT,
                distance REAL,
                document_source TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                recording_date TEXT NOT NULL,
                id_warning_message INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS delivery_warning (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_genre TEXT NOT NULL,
                message_text TEXT NOT NULL,
                document_number INTEGER,
                document_year INTEGER,
                status INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_delivery_page
                ON delivery (document_source, page_number);
            CREATE INDEX IF NOT EXISTS idx_delivery_city
                ON delivery (delivery_city);
            CREATE INDEX IF NOT EXISTS idx_discard_page
                ON delivery_discard (document_source, page_number, status);
            CREATE INDEX IF NOT EXISTS idx_warning_gap
                ON delivery_warning (message_genre, document_number, document_year, status);
            "#,
        )?;
        debug!("database schema ready");
        Ok(())
    }

    /// Online backup into `target`, overwriting it.
    pub fn backup_to(&self, target: &Path) -> Result<()> {
        let mut dst = Connection::open(target)
            .map_err(|e| StoreError::Backup(format!("{}: {e}", target.display())))?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dst)?;
        backup
            .run_to_completion(64, Duration::from_millis(100), None)
            .map_err(|e| StoreError::Backup(e.to_string()))?;
        info!("database backed up to {}", target.display());
        Ok(())
    }

    fn expect_one_row(rows: usize) -> Result<()> {
        if rows == 1 {
            Ok(())
        } else {
            Err(StoreError::RowCount {
                expected: 1,
                actual: rows,
            })
        }
    }
}

impl DeliveryStore for SqliteStore {
    fn insert_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        let rows = self.conn.execute(
            r#"
            INSERT INTO delivery (
                document_number, document_genre, document_date,
                company_name, delivery_city, quantity, delivery_date,
                vehicle, vehicle_driver, distance,
                document_source, page_number, recording_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.document_number,
                record.document_genre,
                record.document_date,
                record.company_name,
                record.delivery_city,
                record.quantity,
                record.delivery_date,
                record.vehicle,
                record.vehicle_driver,
                record.distance,
                record.document_source,
                record.page_number,
                record.recording_date,
            ],
        )?;
        Self::expect_one_row(rows)
    }

    fn insert_discard(&self, record: &DeliveryRecord, id_warning_message: i64) -> Result<()> {
        let rows = self.conn.execute(
            r#"
            INSERT INTO delivery_discard (
                document_number, document_genre, document_date,
                company_name, delivery_city, quantity, delivery_date,
                vehicle, vehicle_driver, distance,
                document_source, page_number, recording_date,
                id_warning_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                record.document_number,
                record.document_genre,
                record.document_date,
                record.company_name,
                record.delivery_city,
                record.quantity,
                record.delivery_date,
                record.vehicle,
                record.vehicle_driver,
                record.distance,
                record.document_source,
                record.page_number,
                record.recording_date,
                id_warning_message,
            ],
        )?;
        Self::expect_one_row(rows)
    }

    fn insert_warning(&self, kind: &WarningKind) -> Result<i64> {
        let (number, year) = match kind {
            WarningKind::Gap {
                document_number,
                document_year,
            } => (Some(*document_number), Some(*document_year)),
            _ => (None, None),
        };

        let id = self.conn.query_row(
            r#"
            INSERT INTO delivery_warning (
                message_genre, message_text, document_number, document_year
            ) VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
            params![kind.genre(), kind.render(), number, year],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn resolve_warning(&self, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE delivery_warning SET status = 0 WHERE id = ?1 AND status = 1",
            params![id],
        )?;
        Self::expect_one_row(rows)
    }

    fn is_duplicate(&self, record: &DeliveryRecord) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM delivery
            WHERE (document_source = ?1 AND page_number = ?2)
               OR (document_number = ?3
                   AND document_genre = ?4
                   AND CAST(strftime('%Y', document_date) AS INTEGER) = ?5)
            "#,
            params![
                record.document_source,
                record.page_number,
                record.document_number,
                record.document_genre,
                record.document_year(),
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn open_discard(&self, source: &str, page: u32) -> Result<Option<DiscardRecord>> {
        let discard = self
            .conn
            .query_row(
                r#"
                SELECT document_number, document_genre, document_date,
                       company_name, delivery_city, quantity, delivery_date,
                       vehicle, vehicle_driver, distance, id_warning_message
                FROM delivery_discard
                WHERE status = 1 AND document_source = ?1 AND page_number = ?2
                "#,
                params![source, page],
                |row| {
                    Ok(DiscardRecord {
                        document_number: row.get(0)?,
                        document_genre: row.get(1)?,
                        document_date: row.get(2)?,
                        company_name: row.get(3)?,
                        delivery_city: row.get(4)?,
                        quantity: row.get(5)?,
                        delivery_date: row.get(6)?,
                        vehicle: row.get(7)?,
                        vehicle_driver: row.get(8)?,
                        distance: row.get(9)?,
                        id_warning_message: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(discard)
    }

    fn resolve_discard(&self, source: &str, page: u32) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE delivery_discard SET status = 0
            WHERE status = 1 AND document_source = ?1 AND page_number = ?2
            "#,
            params![source, page],
        )?;
        Ok(())
    }

    fn cached_distance(&self, city: &str) -> Result<Option<Option<f64>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT distance FROM delivery WHERE delivery_city = ?1")?;
        let values: Vec<Option<f64>> = stmt
            .query_map(params![city], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        // Only an unambiguous history counts as a cache hit.
        if values.len() == 1 {
            Ok(Some(values[0]))
        } else {
            Ok(None)
        }
    }

    fn open_gap(&self, document_number: i64, document_year: i32) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                r#"
                SELECT id FROM delivery_warning
                WHERE message_genre = 'GAP' AND status = 1
                  AND document_number = ?1 AND document_year = ?2
                "#,
                params![document_number, document_year],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn unreported_gaps(&self) -> Result<Vec<Gap>> {
        let mut stmt = self.conn.prepare(
            r#"
            WITH RECURSIVE year_bounds AS (
                SELECT CAST(strftime('%Y', document_date) AS INTEGER) AS document_year,
                       MIN(document_number) AS low,
                       MAX(document_number) AS high
                FROM delivery
                GROUP BY document_year
            ), numbers (document_year, document_number, high) AS (
                SELECT document_year, low, high FROM year_bounds
                UNION ALL
                SELECT document_year, document_number + 1, high
                FROM numbers
                WHERE document_number < high
            )
            SELECT n.document_number, n.document_year
            FROM numbers n
            WHERE NOT EXISTS (
                    SELECT 1 FROM delivery d
                    WHERE d.document_number = n.document_number
                      AND CAST(strftime('%Y', d.document_date) AS INTEGER) = n.document_year)
              AND NOT EXISTS (
                    SELECT 1 FROM delivery_discard dd
                    WHERE dd.document_number = n.document_number
                      AND CAST(strftime('%Y', dd.document_date) AS INTEGER) = n.document_year)
              AND NOT EXISTS (
                    SELECT 1 FROM delivery_warning w
                    WHERE w.message_genre = 'GAP' AND w.status = 1
                      AND w.document_number = n.document_number
                      AND w.document_year = n.document_year)
            ORDER BY n.document_year, n.document_number
            "#,
        )?;
        let gaps = stmt
            .query_map([], |row| {
                Ok(Gap {
                    document_number: row.get(0)?,
                    document_year: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(gaps)
    }

    fn monthly_overview(&self, year: i32, month: u32) -> Result<Vec<OverviewRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document_number, document_date, company_name, delivery_city,
                   quantity, delivery_date, vehicle
            FROM delivery
            WHERE CAST(strftime('%Y', delivery_date) AS INTEGER) = ?1
              AND CAST(strftime('%m', delivery_date) AS INTEGER) = ?2
            ORDER BY document_number
            "#,
        )?;
        let rows = stmt
            .query_map(params![year, month], |row| {
                Ok(OverviewRow {
                    document_number: row.get(0)?,
                    document_date: row.get(1)?,
                    company_name: row.get(2)?,
                    delivery_city: row.get(3)?,
                    quantity: row.get(4)?,
                    delivery_date: row.get(5)?,
                    vehicle: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }

    fn yearly_summary(&self, year: i32) -> Result<Vec<SummaryRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document_number, document_date, delivery_city,
                   delivery_date, vehicle, distance
            FROM delivery d
            WHERE CAST(strftime('%Y', delivery_date) AS INTEGER) = ?1
              AND distance IS NOT NULL
              AND distance = (SELECT MAX(distance) FROM delivery d2
                              WHERE d2.delivery_date = d.delivery_date
                                AND d2.vehicle = d.vehicle)
            ORDER BY vehicle, delivery_date
            "#,
        )?;
        let rows = stmt
            .query_map(params![year], |row| {
                Ok(SummaryRow {
                    document_number: row.get(0)?,
                    document_date: row.get(1)?,
                    delivery_city: row.get(2)?,
                    delivery_date: row.get(3)?,
                    vehicle: row.get(4)?,
                    distance: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }

    fn recent_months(&self, since: NaiveDateTime) -> Result<Vec<(i32, u32)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT CAST(strftime('%Y', delivery_date) AS INTEGER) AS year,
                   CAST(strftime('%m', delivery_date) AS INTEGER) AS month
            FROM delivery
            WHERE recording_date >= ?1
            ORDER BY 1, 2
            "#,
        )?;
        let rows = stmt
            .query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SimilarityField, WarningLink};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(number: i64, page: u32) -> DeliveryRecord {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        DeliveryRecord {
            document_number: Some(number),
            document_genre: Some("TA".to_string()),
            document_date: Some(date),
            company_name: Some("ACME SRL".to_string()),
            delivery_city: Some("MILANO".to_string()),
            quantity: Some(3200),
            delivery_date: Some(date),
            vehicle: Some("AB123CD".to_string()),
            vehicle_driver: Some("MARIO ROSSI".to_string()),
            distance: Some(52.4),
            document_source: "2024_01_DDT_0001_0100.pdf".to_string(),
            page_number: page,
            recording_date: date.and_hms_opt(8, 0, 0).unwrap(),
            warning: WarningLink::None,
        }
    }

    #[test]
    fn duplicate_by_page_and_by_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_delivery(&record(145, 1)).unwrap();

        // Same source + page.
        assert!(store.is_duplicate(&record(999, 1)).unwrap());

        // Same number + genre + year, different page.
        assert!(store.is_duplicate(&record(145, 2)).unwrap());

        // Different document entirely.
        assert!(!store.is_duplicate(&record(146, 2)).unwrap());

        // Same number, different year.
        let mut other_year = record(145, 3);
        other_year.document_date = NaiveDate::from_ymd_opt(2023, 3, 10);
        assert!(!store.is_duplicate(&other_year).unwrap());
    }

    #[test]
    fn distance_cache_hit_needs_single_distinct_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.cached_distance("MILANO").unwrap(), None);

        store.insert_delivery(&record(145, 1)).unwrap();
        assert_eq!(store.cached_distance("MILANO").unwrap(), Some(Some(52.4)));

        // A second, conflicting distance makes the history ambiguous.
        let mut other = record(146, 2);
        other.distance = Some(60.0);
        store.insert_delivery(&other).unwrap();
        assert_eq!(store.cached_distance("MILANO").unwrap(), None);
    }

    #[test]
    fn cached_distance_may_be_unresolved() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut rec = record(145, 1);
        rec.distance = None;
        store.insert_delivery(&rec).unwrap();
        assert_eq!(store.cached_distance("MILANO").unwrap(), Some(None));
    }

    #[test]
    fn warning_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_warning(&WarningKind::Similarity {
                field: SimilarityField::Vehicle,
                record: Some("ZZ000ZZ".to_string()),
                page: 1,
                doc: "2024_01_DDT_0001_0100.pdf".to_string(),
            })
            .unwrap();
        assert!(id > 0);
        store.resolve_warning(id).unwrap();
        // Resolving twice hits zero rows.
        assert!(store.resolve_warning(id).is_err());
    }

    #[test]
    fn discard_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let warning = store
            .insert_warning(&WarningKind::Discard {
                page: 2,
                doc: "2024_01_DDT_0001_0100.pdf".to_string(),
                failed_rules: "QUANTITY".to_string(),
                document_number: Some(145),
                document_genre: Some("TA".to_string()),
                document_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            })
            .unwrap();

        let mut rec = record(145, 2);
        rec.quantity = None;
        store.insert_discard(&rec, warning).unwrap();

        let discard = store
            .open_discard("2024_01_DDT_0001_0100.pdf", 2)
            .unwrap()
            .unwrap();
        assert_eq!(discard.document_number, Some(145));
        assert_eq!(discard.quantity, None);
        assert_eq!(discard.id_warning_message, warning);

        store.resolve_discard("2024_01_DDT_0001_0100.pdf", 2).unwrap();
        assert!(store
            .open_discard("2024_01_DDT_0001_0100.pdf", 2)
            .unwrap()
            .is_none());
    }

    #[test]
    fn gap_detection_excludes_discards_and_open_warnings() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_delivery(&record(145, 1)).unwrap();
        store.insert_delivery(&record(148, 2)).unwrap();

        // 147 is a known discard, so only 146 is a fresh gap.
        let mut discarded = record(147, 3);
        discarded.quantity = None;
        let warning = store
            .insert_warning(&WarningKind::Discard {
                page: 3,
                doc: discarded.document_source.clone(),
                failed_rules: "QUANTITY".to_string(),
                document_number: Some(147),
                document_genre: Some("TA".to_string()),
                document_date: discarded.document_date,
            })
            .unwrap();
        store.insert_discard(&discarded, warning).unwrap();

        let gaps = store.unreported_gaps().unwrap();
        assert_eq!(
            gaps,
            vec![Gap {
                document_number: 146,
                document_year: 2024
            }]
        );

        // Reporting the gap removes it from the next sweep.
        let gap_id = store
            .insert_warning(&WarningKind::Gap {
                document_number: 146,
                document_year: 2024,
            })
            .unwrap();
        assert!(store.unreported_gaps().unwrap().is_empty());

        // The open warning is found and resolvable once 146 appears.
        assert_eq!(store.open_gap(146, 2024).unwrap(), Some(gap_id));
        store.resolve_warning(gap_id).unwrap();
        assert_eq!(store.open_gap(146, 2024).unwrap(), None);
    }

    #[test]
    fn monthly_overview_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_delivery(&record(146, 2)).unwrap();
        store.insert_delivery(&record(145, 1)).unwrap();

        let rows = store.monthly_overview(2024, 3).unwrap();
        let numbers: Vec<i64> = rows.iter().map(|r| r.document_number).collect();
        assert_eq!(numbers, vec![145, 146]);
        assert!(store.monthly_overview(2024, 4).unwrap().is_empty());
    }

    #[test]
    fn yearly_summary_keeps_farthest_per_vehicle_and_date() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_delivery(&record(145, 1)).unwrap();
        let mut nearer = record(146, 2);
        nearer.distance = Some(10.0);
        nearer.delivery_city = Some("MONZA".to_string());
        store.insert_delivery(&nearer).unwrap();

        let rows = store.yearly_summary(2024).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].document_number, 145);
        assert_eq!(rows[0].distance, 52.4);
    }

    #[test]
    fn recent_months_filters_by_recording_date() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_delivery(&record(145, 1)).unwrap();

        let before = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(store.recent_months(before).unwrap(), vec![(2024, 3)]);

        let after = NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(store.recent_months(after).unwrap().is_empty());
    }
}
