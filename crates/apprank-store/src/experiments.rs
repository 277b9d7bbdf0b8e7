use apprank_utils::types::ExperimentStatus;
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::configured_models::get_configured_model;
use crate::error::{StoreError, map_unique};
use crate::models::{Experiment, NewExperiment};
use crate::store::{Store, or_not_found};
use crate::templates::get_template;

const ENTITY: &str = "Experiment";

impl Store {
    /// Insert an experiment in the RUNNING state.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown template or configured model, `Conflict` if
    /// the name is taken.
    pub fn create_experiment(&self, new: &NewExperiment) -> Result<Experiment, StoreError> {
        self.with_tx(|tx| {
            get_template(tx, new.prompt_template_id)?;
            for model_id in &new.configured_model_ids {
                get_configured_model(tx, *model_id)?;
            }

            tx.execute(
                "INSERT INTO experiments (name, prompt_template_id, num_runs, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.name,
                    new.prompt_template_id,
                    new.num_runs,
                    ExperimentStatus::Running.as_str(),
                    Utc::now()
                ],
            )
            .map_err(|e| map_unique(e, ENTITY, "name", new.name.clone()))?;
            let id = tx.last_insert_rowid();

            let mut position = 0i64;
            for model_id in &new.configured_model_ids {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO experiment_configured_models \
                     (experiment_id, configured_model_id, position) VALUES (?1, ?2, ?3)",
                    params![id, model_id, position],
                )?;
                position += i64::try_from(inserted).unwrap_or(0);
            }

            debug!(experiment_id = id, name = %new.name, "Experiment created");
            get_experiment(tx, id)
        })
    }

    pub fn get_experiment(&self, id: i64) -> Result<Experiment, StoreError> {
        self.with_conn(|conn| get_experiment(conn, id))
    }

    /// Look an experiment up by its unique name.
    pub fn get_experiment_by_name(&self, name: &str) -> Result<Experiment, StoreError> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM experiments WHERE name = ?1",
                    params![name],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::NameNotFound {
                        entity: ENTITY,
                        name: name.to_string(),
                    },
                    other => StoreError::Sqlite(other),
                })?;
            get_experiment(conn, id)
        })
    }

    pub fn list_experiments(&self) -> Result<Vec<Experiment>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM experiments ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| get_experiment(conn, id)).collect()
        })
    }

    /// Persist only the status column, in its own write.
    pub fn update_experiment_status(
        &self,
        id: i64,
        status: ExperimentStatus,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| set_status(conn, id, status))
    }

    /// Delete an experiment; its runs, rankings and criteria go with it.
    pub fn delete_experiment(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM experiments WHERE id = ?1", params![id])?;
            if rows == 0 {
                return Err(StoreError::not_found(ENTITY, id));
            }
            debug!(experiment_id = id, "Experiment deleted");
            Ok(())
        })
    }
}

pub(crate) fn set_status(
    conn: &Connection,
    id: i64,
    status: ExperimentStatus,
) -> Result<(), StoreError> {
    let rows = conn.execute(
        "UPDATE experiments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if rows == 0 {
        return Err(StoreError::not_found(ENTITY, id));
    }
    Ok(())
}

pub(crate) fn get_experiment(conn: &Connection, id: i64) -> Result<Experiment, StoreError> {
    let mut experiment = or_not_found(
        conn.query_row(
            "SELECT id, name, prompt_template_id, num_runs, status, created_at \
             FROM experiments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Experiment {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    prompt_template_id: row.get(2)?,
                    configured_model_ids: Vec::new(),
                    num_runs: row.get(3)?,
                    status: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        ),
        ENTITY,
        id,
    )?;

    let mut stmt = conn.prepare(
        "SELECT configured_model_id FROM experiment_configured_models \
         WHERE experiment_id = ?1 ORDER BY position",
    )?;
    experiment.configured_model_ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(experiment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{NewCriterion, RunOutcome};

    #[test]
    fn created_running_with_models_in_order() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, _) = fixtures::experiment(&store, 2, 1);
        assert_eq!(experiment.status, "running");
        assert_eq!(experiment.configured_model_ids.len(), 2);
        assert!(experiment.configured_model_ids[0] < experiment.configured_model_ids[1]);
        assert_eq!(store.list_experiments().unwrap(), vec![experiment]);
    }

    #[test]
    fn names_are_unique() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let err = store
            .create_experiment(&NewExperiment {
                name: experiment.name.clone(),
                prompt_template_id: template.id,
                configured_model_ids: experiment.configured_model_ids.clone(),
                num_runs: 1,
            })
            .unwrap_err();
        match err {
            StoreError::Conflict { field, value, .. } => {
                assert_eq!(field, "name");
                assert_eq!(value, experiment.name);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_runs_violates_check() {
        let store = Store::open_in_memory().unwrap();
        let template = fixtures::template(&store, 1);
        let result = store.create_experiment(&NewExperiment {
            name: "zero".to_string(),
            prompt_template_id: template.id,
            configured_model_ids: Vec::new(),
            num_runs: 0,
        });
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        assert!(matches!(
            store.get_experiment_by_name("zero"),
            Err(StoreError::NameNotFound { .. })
        ));
    }

    #[test]
    fn status_update_is_persisted() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, _) = fixtures::experiment(&store, 1, 1);
        store
            .update_experiment_status(experiment.id, ExperimentStatus::Failed)
            .unwrap();
        assert_eq!(store.get_experiment(experiment.id).unwrap().status, "failed");
        assert!(matches!(
            store.update_experiment_status(999, ExperimentStatus::Failed),
            Err(StoreError::NotFound { id: 999, .. })
        ));
    }

    #[test]
    fn delete_cascades_to_results() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let outcome = RunOutcome {
            configured_model_id: experiment.configured_model_ids[0],
            feature_id: template.user_prompt.features[0].id,
            elapsed_time: 0.5,
            apps: vec!["Maps".to_string()],
            criteria: vec![NewCriterion::default()],
        };
        let runs = store
            .commit_experiment_results(experiment.id, &[outcome], ExperimentStatus::Completed)
            .unwrap();

        store.delete_experiment(experiment.id).unwrap();
        assert!(store.get_run(runs[0]).is_err());
        assert!(store.list_rankings_for_run(runs[0]).unwrap().is_empty());
        assert!(store.list_criteria(Some(runs[0])).unwrap().is_empty());
        // Apps are a global dictionary and outlive the experiment.
        assert_eq!(store.list_apps().unwrap().len(), 1);
    }
}
