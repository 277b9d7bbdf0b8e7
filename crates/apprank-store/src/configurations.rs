use rusqlite::{Connection, params};

use crate::error::StoreError;
use crate::models::{Configuration, ConfigurationUpdate, NEUTRAL_TOP_P, NewConfiguration};
use crate::store::{Store, count_refs, or_not_found};

const ENTITY: &str = "Configuration";

impl Store {
    pub fn create_configuration(
        &self,
        new: &NewConfiguration,
    ) -> Result<Configuration, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO configurations (name, temperature, top_p) VALUES (?1, ?2, ?3)",
                params![
                    new.name,
                    new.temperature,
                    new.top_p.unwrap_or(NEUTRAL_TOP_P)
                ],
            )?;
            get_configuration(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_configuration(&self, id: i64) -> Result<Configuration, StoreError> {
        self.with_conn(|conn| get_configuration(conn, id))
    }

    pub fn list_configurations(&self) -> Result<Vec<Configuration>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, temperature, top_p FROM configurations ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], row_to_configuration)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn update_configuration(
        &self,
        id: i64,
        update: &ConfigurationUpdate,
    ) -> Result<Configuration, StoreError> {
        self.with_tx(|tx| {
            let mut configuration = get_configuration(tx, id)?;
            if let Some(name) = &update.name {
                configuration.name.clone_from(name);
            }
            if let Some(temperature) = update.temperature {
                configuration.temperature = temperature;
            }
            if let Some(top_p) = update.top_p {
                configuration.top_p = top_p;
            }
            tx.execute(
                "UPDATE configurations SET name = ?1, temperature = ?2, top_p = ?3 WHERE id = ?4",
                params![
                    configuration.name,
                    configuration.temperature,
                    configuration.top_p,
                    id
                ],
            )?;
            Ok(configuration)
        })
    }

    /// Delete a configuration that no configured model uses.
    pub fn delete_configuration(&self, id: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            get_configuration(tx, id)?;
            let models = count_refs(tx, "configured_models", "configuration_id", id)?;
            if models > 0 {
                return Err(StoreError::protected(ENTITY, id, models, "configured model"));
            }
            tx.execute("DELETE FROM configurations WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

pub(crate) fn get_configuration(conn: &Connection, id: i64) -> Result<Configuration, StoreError> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, temperature, top_p FROM configurations WHERE id = ?1",
            params![id],
            row_to_configuration,
        ),
        ENTITY,
        id,
    )
}

fn row_to_configuration(row: &rusqlite::Row<'_>) -> rusqlite::Result<Configuration> {
    Ok(Configuration {
        id: row.get(0)?,
        name: row.get(1)?,
        temperature: row.get(2)?,
        top_p: row.get(3)?,
    })
}
