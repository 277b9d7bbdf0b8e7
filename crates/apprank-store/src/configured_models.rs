use rusqlite::{Connection, params};

use crate::configurations::get_configuration;
use crate::error::{StoreError, map_unique};
use crate::llms::get_llm;
use crate::models::{ConfiguredModel, ConfiguredModelDetail, NewConfiguredModel};
use crate::store::{Store, count_refs, or_not_found};

const ENTITY: &str = "ConfiguredModel";

impl Store {
    /// Pair an LLM with a configuration. Each pair exists at most once.
    pub fn create_configured_model(
        &self,
        new: &NewConfiguredModel,
    ) -> Result<ConfiguredModel, StoreError> {
        self.with_tx(|tx| {
            get_llm(tx, new.llm_id)?;
            get_configuration(tx, new.configuration_id)?;
            tx.execute(
                "INSERT INTO configured_models (llm_id, configuration_id, short_name) \
                 VALUES (?1, ?2, ?3)",
                params![new.llm_id, new.configuration_id, new.short_name],
            )
            .map_err(|e| {
                map_unique(
                    e,
                    ENTITY,
                    "llm/configuration pair",
                    format!("{}/{}", new.llm_id, new.configuration_id),
                )
            })?;
            get_configured_model(tx, tx.last_insert_rowid())
        })
    }

    pub fn get_configured_model(&self, id: i64) -> Result<ConfiguredModel, StoreError> {
        self.with_conn(|conn| get_configured_model(conn, id))
    }

    /// The model with its LLM and configuration resolved.
    pub fn get_configured_model_detail(
        &self,
        id: i64,
    ) -> Result<ConfiguredModelDetail, StoreError> {
        self.with_conn(|conn| {
            let model = get_configured_model(conn, id)?;
            Ok(ConfiguredModelDetail {
                llm: get_llm(conn, model.llm_id)?,
                configuration: get_configuration(conn, model.configuration_id)?,
                model,
            })
        })
    }

    pub fn list_configured_models(&self) -> Result<Vec<ConfiguredModel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, llm_id, configuration_id, short_name \
                 FROM configured_models ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], row_to_configured_model)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Delete a configured model that no experiment or run references.
    pub fn delete_configured_model(&self, id: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            get_configured_model(tx, id)?;
            let runs = count_refs(tx, "runs", "configured_model_id", id)?;
            if runs > 0 {
                return Err(StoreError::protected(ENTITY, id, runs, "run"));
            }
            let experiments =
                count_refs(tx, "experiment_configured_models", "configured_model_id", id)?;
            if experiments > 0 {
                return Err(StoreError::protected(ENTITY, id, experiments, "experiment"));
            }
            tx.execute("DELETE FROM configured_models WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

pub(crate) fn get_configured_model(
    conn: &Connection,
    id: i64,
) -> Result<ConfiguredModel, StoreError> {
    or_not_found(
        conn.query_row(
            "SELECT id, llm_id, configuration_id, short_name FROM configured_models WHERE id = ?1",
            params![id],
            row_to_configured_model,
        ),
        ENTITY,
        id,
    )
}

fn row_to_configured_model(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConfiguredModel> {
    Ok(ConfiguredModel {
        id: row.get(0)?,
        llm_id: row.get(1)?,
        configuration_id: row.get(2)?,
        short_name: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn pair_is_unique() {
        let store = Store::open_in_memory().unwrap();
        let model = fixtures::configured_model(&store);
        let err = store
            .create_configured_model(&NewConfiguredModel {
                llm_id: model.llm_id,
                configuration_id: model.configuration_id,
                short_name: "again".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.list_configured_models().unwrap().len(), 1);
    }

    #[test]
    fn unknown_llm_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let configuration = fixtures::configuration(&store);
        let err = store
            .create_configured_model(&NewConfiguredModel {
                llm_id: 99,
                configuration_id: configuration.id,
                short_name: "ghost".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "LLM", id: 99 }));
    }

    #[test]
    fn detail_joins_llm_and_configuration() {
        let store = Store::open_in_memory().unwrap();
        let model = fixtures::configured_model(&store);
        let detail = store.get_configured_model_detail(model.id).unwrap();
        assert_eq!(detail.model, model);
        assert_eq!(detail.llm.id, model.llm_id);
        assert_eq!(detail.configuration.id, model.configuration_id);
    }

    #[test]
    fn model_used_by_experiment_is_protected() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, _) = fixtures::experiment(&store, 1, 1);
        let model_id = experiment.configured_model_ids[0];
        let err = store.delete_configured_model(model_id).unwrap_err();
        assert!(err.to_string().contains("referenced by 1 experiment"));
    }
}
