use crate::world::access_list::NameResolver;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::path::Path;

const WORLD_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS houses (
  id INTEGER PRIMARY KEY,
  owner INTEGER NOT NULL DEFAULT 0,
  paid INTEGER NOT NULL DEFAULT 0,
  warnings INTEGER NOT NULL DEFAULT 0,
  name TEXT NOT NULL DEFAULT '',
  town_id INTEGER NOT NULL DEFAULT 0,
  rent INTEGER NOT NULL DEFAULT 0,
  size INTEGER NOT NULL DEFAULT 0,
  beds INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS house_lists (
  house_id INTEGER NOT NULL,
  listid INTEGER NOT NULL,
  list TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS house_lists_house_id ON house_lists (house_id);
CREATE TABLE IF NOT EXISTS tile_store (
  house_id INTEGER NOT NULL,
  data BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS tile_store_house_id ON tile_store (house_id);
CREATE TABLE IF NOT EXISTS players (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL UNIQUE COLLATE NOCASE
);
CREATE TABLE IF NOT EXISTS guilds (
  id INTEGER PRIMARY KEY,
  name TEXT NOT NULL UNIQUE COLLATE NOCASE
);
"#;

/// Rows per multi-row INSERT. Keeps the bound parameter count well under
/// SQLite's limit.
const INSERT_CHUNK_ROWS: usize = 400;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
    Rejected(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(err) => write!(f, "sqlite error: {}", err),
            StoreError::InvalidData(message) => write!(f, "invalid stored data: {}", message),
            StoreError::Rejected(message) => write!(f, "store rejected operation: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRow {
    pub house_id: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseRow {
    pub id: u32,
    pub owner: u32,
    pub paid: i64,
    pub warnings: u32,
    pub name: String,
    pub town_id: u32,
    pub rent: u32,
    pub size: u32,
    pub beds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseListRow {
    pub house_id: u32,
    pub list_id: u32,
    pub text: String,
}

/// Relational backing of the house tables. Reads are plain queries; every
/// write goes through a [`StoreTransaction`].
pub trait WorldStore {
    /// Tile rows in insertion order.
    fn tile_rows(&self) -> Result<Vec<TileRow>, StoreError>;
    fn house_rows(&self) -> Result<Vec<HouseRow>, StoreError>;
    fn house_list_rows(&self) -> Result<Vec<HouseListRow>, StoreError>;
    fn begin(&mut self) -> Result<Box<dyn StoreTransaction + '_>, StoreError>;
}

/// Open write transaction. Dropping it without `commit` discards every
/// change made through it.
pub trait StoreTransaction {
    fn clear_tile_rows(&mut self) -> Result<(), StoreError>;
    fn insert_tile_rows(&mut self, rows: &[TileRow]) -> Result<(), StoreError>;
    fn clear_house_lists(&mut self) -> Result<(), StoreError>;
    fn upsert_house(&mut self, row: &HouseRow) -> Result<(), StoreError>;
    fn insert_house_lists(&mut self, rows: &[HouseListRow]) -> Result<(), StoreError>;
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(WORLD_DB_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Character and guild lookups against this database.
    pub fn name_resolver(&self) -> SqliteNameResolver<'_> {
        SqliteNameResolver { conn: &self.conn }
    }

    pub fn add_player(&self, id: u32, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO players (id, name) VALUES (?1, ?2)",
            params![i64::from(id), name],
        )?;
        Ok(())
    }

    pub fn add_guild(&self, id: u32, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO guilds (id, name) VALUES (?1, ?2)",
            params![i64::from(id), name],
        )?;
        Ok(())
    }
}

impl WorldStore for SqliteStore {
    fn tile_rows(&self) -> Result<Vec<TileRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT house_id, data FROM tile_store ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            let house_id: i64 = row.get(0)?;
            let data: Vec<u8> = row.get(1)?;
            Ok((house_id, data))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (house_id, data) = row?;
            out.push(TileRow {
                house_id: to_u32(house_id, "tile_store.house_id")?,
                data,
            });
        }
        Ok(out)
    }

    fn house_rows(&self) -> Result<Vec<HouseRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, paid, warnings, name, town_id, rent, size, beds FROM houses ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, i64>(8)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, owner, paid, warnings, name, town_id, rent, size, beds) = row?;
            out.push(HouseRow {
                id: to_u32(id, "houses.id")?,
                owner: to_u32(owner, "houses.owner")?,
                paid,
                warnings: to_u32(warnings, "houses.warnings")?,
                name,
                town_id: to_u32(town_id, "houses.town_id")?,
                rent: to_u32(rent, "houses.rent")?,
                size: to_u32(size, "houses.size")?,
                beds: to_u32(beds, "houses.beds")?,
            });
        }
        Ok(out)
    }

    fn house_list_rows(&self) -> Result<Vec<HouseListRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT house_id, listid, list FROM house_lists ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (house_id, list_id, text) = row?;
            out.push(HouseListRow {
                house_id: to_u32(house_id, "house_lists.house_id")?,
                list_id: to_u32(list_id, "house_lists.listid")?,
                text,
            });
        }
        Ok(out)
    }

    fn begin(&mut self) -> Result<Box<dyn StoreTransaction + '_>, StoreError> {
        let tx = self.conn.transaction()?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction<'a> {
    tx: Transaction<'a>,
}

impl SqliteTransaction<'_> {
    fn insert_chunked(
        &mut self,
        prefix: &str,
        columns: usize,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        let placeholder = format!("({})", vec!["?"; columns].join(", "));
        for chunk in values.chunks(columns * INSERT_CHUNK_ROWS) {
            let rows = chunk.len() / columns;
            let mut sql = String::from(prefix);
            sql.push_str(&vec![placeholder.as_str(); rows].join(", "));
            self.tx.execute(&sql, params_from_iter(chunk.iter()))?;
        }
        Ok(())
    }
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn clear_tile_rows(&mut self) -> Result<(), StoreError> {
        self.tx.execute("DELETE FROM tile_store", [])?;
        Ok(())
    }

    fn insert_tile_rows(&mut self, rows: &[TileRow]) -> Result<(), StoreError> {
        let mut values = Vec::with_capacity(rows.len() * 2);
        for row in rows {
            values.push(Value::Integer(i64::from(row.house_id)));
            values.push(Value::Blob(row.data.clone()));
        }
        self.insert_chunked("INSERT INTO tile_store (house_id, data) VALUES ", 2, values)
    }

    fn clear_house_lists(&mut self) -> Result<(), StoreError> {
        self.tx.execute("DELETE FROM house_lists", [])?;
        Ok(())
    }

    fn upsert_house(&mut self, row: &HouseRow) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO houses (id, owner, paid, warnings, name, town_id, rent, size, beds) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(id) DO UPDATE SET owner = excluded.owner, paid = excluded.paid, \
             warnings = excluded.warnings, name = excluded.name, town_id = excluded.town_id, \
             rent = excluded.rent, size = excluded.size, beds = excluded.beds",
            params![
                i64::from(row.id),
                i64::from(row.owner),
                row.paid,
                i64::from(row.warnings),
                row.name,
                i64::from(row.town_id),
                i64::from(row.rent),
                i64::from(row.size),
                i64::from(row.beds),
            ],
        )?;
        Ok(())
    }

    fn insert_house_lists(&mut self, rows: &[HouseListRow]) -> Result<(), StoreError> {
        let mut values = Vec::with_capacity(rows.len() * 3);
        for row in rows {
            values.push(Value::Integer(i64::from(row.house_id)));
            values.push(Value::Integer(i64::from(row.list_id)));
            values.push(Value::Text(row.text.clone()));
        }
        self.insert_chunked(
            "INSERT INTO house_lists (house_id, listid, list) VALUES ",
            3,
            values,
        )
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit()?;
        Ok(())
    }
}

pub struct SqliteNameResolver<'a> {
    conn: &'a Connection,
}

impl SqliteNameResolver<'_> {
    fn lookup(&self, sql: &str, name: &str) -> Option<u32> {
        let found = self
            .conn
            .query_row(sql, params![name], |row| row.get::<_, i64>(0))
            .optional();
        match found {
            Ok(Some(id)) => u32::try_from(id).ok(),
            Ok(None) => None,
            Err(err) => {
                crate::telemetry::logging::log_error(&format!(
                    "name lookup for '{}' failed: {}",
                    name, err
                ));
                None
            }
        }
    }
}

impl NameResolver for SqliteNameResolver<'_> {
    fn player_id(&mut self, name: &str) -> Option<u32> {
        self.lookup("SELECT id FROM players WHERE name = ?1", name)
    }

    fn guild_id(&mut self, name: &str) -> Option<u32> {
        self.lookup("SELECT id FROM guilds WHERE name = ?1", name)
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} out of range: {}", column, value)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Store whose transactions refuse to commit. The inner transaction is
    /// dropped on the refusal, which rolls it back.
    pub(crate) struct CommitRefusingStore(pub SqliteStore);

    struct RefusingTransaction<'a> {
        inner: Box<dyn StoreTransaction + 'a>,
    }

    impl WorldStore for CommitRefusingStore {
        fn tile_rows(&self) -> Result<Vec<TileRow>, StoreError> {
            self.0.tile_rows()
        }

        fn house_rows(&self) -> Result<Vec<HouseRow>, StoreError> {
            self.0.house_rows()
        }

        fn house_list_rows(&self) -> Result<Vec<HouseListRow>, StoreError> {
            self.0.house_list_rows()
        }

        fn begin(&mut self) -> Result<Box<dyn StoreTransaction + '_>, StoreError> {
            let inner = self.0.begin()?;
            Ok(Box::new(RefusingTransaction { inner }))
        }
    }

    impl StoreTransaction for RefusingTransaction<'_> {
        fn clear_tile_rows(&mut self) -> Result<(), StoreError> {
            self.inner.clear_tile_rows()
        }

        fn insert_tile_rows(&mut self, rows: &[TileRow]) -> Result<(), StoreError> {
            self.inner.insert_tile_rows(rows)
        }

        fn clear_house_lists(&mut self) -> Result<(), StoreError> {
            self.inner.clear_house_lists()
        }

        fn upsert_house(&mut self, row: &HouseRow) -> Result<(), StoreError> {
            self.inner.upsert_house(row)
        }

        fn insert_house_lists(&mut self, rows: &[HouseListRow]) -> Result<(), StoreError> {
            self.inner.insert_house_lists(rows)
        }

        fn commit(self: Box<Self>) -> Result<(), StoreError> {
            Err(StoreError::Rejected("commit refused".to_string()))
        }
    }

    fn house_row(id: u32, owner: u32) -> HouseRow {
        HouseRow {
            id,
            owner,
            paid: 1_700_000_000,
            warnings: 1,
            name: format!("House {}", id),
            town_id: 3,
            rent: 1000,
            size: 12,
            beds: 2,
        }
    }

    #[test]
    fn tile_rows_keep_insertion_order_across_chunks() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        let rows: Vec<TileRow> = (0..(INSERT_CHUNK_ROWS as u32 * 2 + 7))
            .map(|index| TileRow {
                house_id: index % 5,
                data: index.to_le_bytes().to_vec(),
            })
            .collect();
        let mut tx = store.begin().expect("begin");
        tx.insert_tile_rows(&rows).expect("insert");
        tx.commit().expect("commit");
        assert_eq!(store.tile_rows().expect("rows"), rows);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        let row = TileRow {
            house_id: 1,
            data: vec![1, 2, 3],
        };
        let mut tx = store.begin().expect("begin");
        tx.insert_tile_rows(std::slice::from_ref(&row)).expect("insert");
        tx.commit().expect("commit");

        let mut tx = store.begin().expect("begin");
        tx.clear_tile_rows().expect("clear");
        drop(tx);
        assert_eq!(store.tile_rows().expect("rows"), vec![row]);
    }

    #[test]
    fn upsert_replaces_existing_house() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        let mut tx = store.begin().expect("begin");
        tx.upsert_house(&house_row(1, 10)).expect("insert");
        tx.upsert_house(&house_row(2, 0)).expect("insert");
        tx.upsert_house(&house_row(1, 20)).expect("update");
        tx.commit().expect("commit");

        let houses = store.house_rows().expect("rows");
        assert_eq!(houses.len(), 2);
        assert_eq!(houses[0], house_row(1, 20));
    }

    #[test]
    fn house_lists_insert_and_clear() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        let rows = vec![
            HouseListRow {
                house_id: 1,
                list_id: 0x100,
                text: "Eremo\nCipfried".to_string(),
            },
            HouseListRow {
                house_id: 1,
                list_id: 3,
                text: "@Red Rose".to_string(),
            },
        ];
        let mut tx = store.begin().expect("begin");
        tx.insert_house_lists(&rows).expect("insert");
        tx.commit().expect("commit");
        assert_eq!(store.house_list_rows().expect("rows"), rows);

        let mut tx = store.begin().expect("begin");
        tx.clear_house_lists().expect("clear");
        tx.commit().expect("commit");
        assert!(store.house_list_rows().expect("rows").is_empty());
    }

    #[test]
    fn refused_commit_discards_changes() {
        let mut store = CommitRefusingStore(SqliteStore::open_in_memory().expect("store"));
        let mut tx = store.begin().expect("begin");
        tx.upsert_house(&house_row(1, 10)).expect("insert");
        assert!(matches!(tx.commit(), Err(StoreError::Rejected(_))));
        assert!(store.house_rows().expect("rows").is_empty());
    }

    #[test]
    fn name_resolver_ignores_case() {
        let store = SqliteStore::open_in_memory().expect("store");
        store.add_player(7, "Eremo").expect("player");
        store.add_guild(3, "Red Rose").expect("guild");
        let mut resolver = store.name_resolver();
        assert_eq!(resolver.player_id("eREMO"), Some(7));
        assert_eq!(resolver.player_id("Nobody"), None);
        assert_eq!(resolver.guild_id("red rose"), Some(3));
    }

    #[test]
    fn out_of_range_values_are_invalid_data() {
        let store = SqliteStore::open_in_memory().expect("store");
        store
            .connection()
            .execute("INSERT INTO houses (id, owner) VALUES (1, -5)", [])
            .expect("insert");
        assert!(matches!(store.house_rows(), Err(StoreError::InvalidData(_))));
    }
}
