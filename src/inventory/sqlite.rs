use anyhow::Result;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{clamp_qty, InventoryStore};

pub struct SqliteInventoryStore {
    conn: Connection,
    seed: Vec<String>,
}

impl SqliteInventoryStore {
    /// Opens a database file, or a `file:` URI (shared in-memory databases
    /// in tests).
    pub fn open(db_path: &str, seed: &[String]) -> Result<Self> {
        let conn = if db_path.starts_with("file:") {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )?
        } else {
            Connection::open(db_path)?
        };
        Ok(Self {
            conn,
            seed: seed.to_vec(),
        })
    }
}

impl InventoryStore for SqliteInventoryStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_schema(&mut self) -> Result<()> {
        let existed: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'inventory')",
            [],
            |row| row.get(0),
        )?;
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
              component TEXT PRIMARY KEY,
              quantity INTEGER NOT NULL CHECK (quantity >= 0)
            );
            "#,
        )?;
        if !existed {
            let tx = self.conn.transaction()?;
            for name in &self.seed {
                tx.execute(
                    "INSERT OR IGNORE INTO inventory(component, quantity) VALUES (?1, 0)",
                    params![name],
                )?;
            }
            tx.commit()?;
        }
        Ok(())
    }

    fn read_qty(&mut self, component: &str) -> Result<u32> {
        let qty: Option<i64> = self
            .conn
            .query_row(
                "SELECT quantity FROM inventory WHERE component = ?1",
                params![component],
                |row| row.get(0),
            )
            .optional()?;
        match qty {
            Some(qty) => Ok(clamp_qty(qty)),
            None => {
                self.conn.execute(
                    "INSERT INTO inventory(component, quantity) VALUES (?1, 0)",
                    params![component],
                )?;
                Ok(0)
            }
        }
    }

    fn write_qty(&mut self, component: &str, qty: i64) -> Result<u32> {
        let qty = clamp_qty(qty);
        self.conn.execute(
            r#"
            INSERT INTO inventory(component, quantity) VALUES (?1, ?2)
            ON CONFLICT(component) DO UPDATE SET quantity = excluded.quantity
            "#,
            params![component, i64::from(qty)],
        )?;
        Ok(qty)
    }

    fn list(&mut self) -> Result<Vec<(String, u32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT component, quantity FROM inventory ORDER BY component")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (name, qty) = row?;
            out.push((name, clamp_qty(qty)));
        }
        Ok(out)
    }
}
