use apprank_utils::types::ExperimentStatus;
use chrono::Utc;
use rusqlite::{Connection, Transaction, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::experiments::set_status;
use crate::models::{MobileApp, MobileAppRanked, RankingCriteria, Run, RunOutcome};
use crate::store::{Store, exists, or_not_found};

impl Store {
    /// Write every run of one execution attempt and the experiment's new
    /// status in a single transaction. Either all of it lands or none of it.
    ///
    /// Returns the new run ids in `outcomes` order.
    pub fn commit_experiment_results(
        &self,
        experiment_id: i64,
        outcomes: &[RunOutcome],
        status: ExperimentStatus,
    ) -> Result<Vec<i64>, StoreError> {
        let run_ids = self.with_tx(|tx| {
            if !exists(tx, "experiments", experiment_id)? {
                return Err(StoreError::not_found("Experiment", experiment_id));
            }
            let mut run_ids = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                run_ids.push(insert_run(tx, experiment_id, outcome)?);
            }
            set_status(tx, experiment_id, status)?;
            Ok(run_ids)
        })?;

        info!(
            experiment_id,
            runs = run_ids.len(),
            status = %status,
            "Experiment results committed"
        );
        Ok(run_ids)
    }

    pub fn get_run(&self, id: i64) -> Result<Run, StoreError> {
        self.with_conn(|conn| {
            or_not_found(
                conn.query_row(
                    "SELECT id, experiment_id, configured_model_id, feature_id, elapsed_time, \
                     created_at FROM runs WHERE id = ?1",
                    params![id],
                    row_to_run,
                ),
                "Run",
                id,
            )
        })
    }

    pub fn list_runs_for_experiment(&self, experiment_id: i64) -> Result<Vec<Run>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, experiment_id, configured_model_id, feature_id, elapsed_time, \
                 created_at FROM runs WHERE experiment_id = ?1 ORDER BY id",
            )?;
            let runs = stmt
                .query_map(params![experiment_id], row_to_run)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(runs)
        })
    }

    /// Ranked apps of one run, best first.
    pub fn list_rankings_for_run(&self, run_id: i64) -> Result<Vec<MobileAppRanked>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.mobile_app_id, a.name, r.run_id, r.rank \
                 FROM mobile_app_rankings r JOIN mobile_apps a ON a.id = r.mobile_app_id \
                 WHERE r.run_id = ?1 ORDER BY r.rank",
            )?;
            let rows = stmt
                .query_map(params![run_id], row_to_ranked)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Every ranking an app received, across runs.
    pub fn list_rankings_for_app(&self, app_id: i64) -> Result<Vec<MobileAppRanked>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.mobile_app_id, a.name, r.run_id, r.rank \
                 FROM mobile_app_rankings r JOIN mobile_apps a ON a.id = r.mobile_app_id \
                 WHERE r.mobile_app_id = ?1 ORDER BY r.run_id, r.rank",
            )?;
            let rows = stmt
                .query_map(params![app_id], row_to_ranked)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_apps(&self) -> Result<Vec<MobileApp>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM mobile_apps ORDER BY name")?;
            let apps = stmt
                .query_map([], |row| {
                    Ok(MobileApp {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(apps)
        })
    }

    pub fn get_app(&self, id: i64) -> Result<MobileApp, StoreError> {
        self.with_conn(|conn| {
            or_not_found(
                conn.query_row(
                    "SELECT id, name FROM mobile_apps WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(MobileApp {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    },
                ),
                "MobileApp",
                id,
            )
        })
    }

    /// All criteria, or only those of `run_id`.
    pub fn list_criteria(&self, run_id: Option<i64>) -> Result<Vec<RankingCriteria>, StoreError> {
        self.with_conn(|conn| {
            let rows = match run_id {
                Some(run_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, description, run_id FROM ranking_criteria \
                         WHERE run_id = ?1 ORDER BY id",
                    )?;
                    stmt.query_map(params![run_id], row_to_criteria)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, description, run_id FROM ranking_criteria ORDER BY id",
                    )?;
                    stmt.query_map([], row_to_criteria)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(rows)
        })
    }

    pub fn get_criterion(&self, id: i64) -> Result<RankingCriteria, StoreError> {
        self.with_conn(|conn| {
            or_not_found(
                conn.query_row(
                    "SELECT id, name, description, run_id FROM ranking_criteria WHERE id = ?1",
                    params![id],
                    row_to_criteria,
                ),
                "RankingCriteria",
                id,
            )
        })
    }
}

fn insert_run(
    tx: &Transaction<'_>,
    experiment_id: i64,
    outcome: &RunOutcome,
) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO runs (experiment_id, configured_model_id, feature_id, elapsed_time, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            experiment_id,
            outcome.configured_model_id,
            outcome.feature_id,
            outcome.elapsed_time,
            Utc::now()
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    for (rank, name) in (1_i64..).zip(outcome.apps.iter()) {
        let app_id = get_or_create_app(tx, name)?;
        tx.execute(
            "INSERT INTO mobile_app_rankings (mobile_app_id, run_id, rank) VALUES (?1, ?2, ?3)",
            params![app_id, run_id, rank],
        )?;
    }

    for criterion in &outcome.criteria {
        tx.execute(
            "INSERT INTO ranking_criteria (name, description, run_id) VALUES (?1, ?2, ?3)",
            params![criterion.name, criterion.description, run_id],
        )?;
    }

    debug!(
        run_id,
        apps = outcome.apps.len(),
        criteria = outcome.criteria.len(),
        "Run staged"
    );
    Ok(run_id)
}

/// Atomic get-or-insert keyed by the unique app name.
pub(crate) fn get_or_create_app(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO mobile_apps (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM mobile_apps WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        id: row.get(0)?,
        experiment_id: row.get(1)?,
        configured_model_id: row.get(2)?,
        feature_id: row.get(3)?,
        elapsed_time: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_ranked(row: &rusqlite::Row<'_>) -> rusqlite::Result<MobileAppRanked> {
    Ok(MobileAppRanked {
        mobile_app_id: row.get(0)?,
        app_name: row.get(1)?,
        run_id: row.get(2)?,
        rank: row.get(3)?,
    })
}

fn row_to_criteria(row: &rusqlite::Row<'_>) -> rusqlite::Result<RankingCriteria> {
    Ok(RankingCriteria {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        run_id: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::NewCriterion;

    fn outcome(model_id: i64, feature_id: i64, apps: &[&str]) -> RunOutcome {
        RunOutcome {
            configured_model_id: model_id,
            feature_id,
            elapsed_time: 1.25,
            apps: apps.iter().map(|a| (*a).to_string()).collect(),
            criteria: vec![NewCriterion {
                name: "Popularity".to_string(),
                description: "Downloads".to_string(),
            }],
        }
    }

    #[test]
    fn commit_writes_runs_rankings_criteria_and_status() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let model_id = experiment.configured_model_ids[0];
        let feature_id = template.user_prompt.features[0].id;

        let runs = store
            .commit_experiment_results(
                experiment.id,
                &[
                    outcome(model_id, feature_id, &["Maps", "Waze"]),
                    outcome(model_id, feature_id, &["Waze", "Maps", "Citymapper"]),
                ],
                ExperimentStatus::Completed,
            )
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(store.get_experiment(experiment.id).unwrap().status, "completed");

        let second = store.list_rankings_for_run(runs[1]).unwrap();
        let names: Vec<(&str, i64)> = second
            .iter()
            .map(|r| (r.app_name.as_str(), r.rank))
            .collect();
        assert_eq!(names, vec![("Waze", 1), ("Maps", 2), ("Citymapper", 3)]);

        // Apps are shared across runs, not duplicated.
        assert_eq!(store.list_apps().unwrap().len(), 3);
        assert_eq!(store.list_criteria(Some(runs[0])).unwrap().len(), 1);
        assert_eq!(store.list_criteria(None).unwrap().len(), 2);

        let run = store.get_run(runs[0]).unwrap();
        assert_eq!(run.feature_id, feature_id);
        assert!((run.elapsed_time - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_commit_leaves_nothing_behind() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let model_id = experiment.configured_model_ids[0];
        let feature_id = template.user_prompt.features[0].id;

        // The second outcome repeats an app inside one run, which the
        // (app, run) uniqueness rejects.
        let result = store.commit_experiment_results(
            experiment.id,
            &[
                outcome(model_id, feature_id, &["Maps"]),
                outcome(model_id, feature_id, &["Waze", "Waze"]),
            ],
            ExperimentStatus::Completed,
        );
        assert!(result.is_err());
        assert!(store.list_runs_for_experiment(experiment.id).unwrap().is_empty());
        assert!(store.list_apps().unwrap().is_empty());
        assert_eq!(store.get_experiment(experiment.id).unwrap().status, "running");
    }

    #[test]
    fn app_lookup_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = store.with_conn(|conn| get_or_create_app(conn, "Maps")).unwrap();
        let second = store.with_conn(|conn| get_or_create_app(conn, "Maps")).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get_app(first).unwrap().name, "Maps");
    }

    #[test]
    fn run_referencing_feature_protects_it() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let model_id = experiment.configured_model_ids[0];
        let feature_id = template.user_prompt.features[0].id;
        store
            .commit_experiment_results(
                experiment.id,
                &[outcome(model_id, feature_id, &[])],
                ExperimentStatus::Completed,
            )
            .unwrap();

        // Raw delete is blocked by the RESTRICT reference.
        let raw = store.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM features WHERE id = ?1", params![feature_id])?)
        });
        assert!(raw.is_err());
        assert!(store.get_feature(feature_id).is_ok());
    }

    #[test]
    fn rankings_per_app_span_runs() {
        let store = Store::open_in_memory().unwrap();
        let (experiment, template) = fixtures::experiment(&store, 1, 1);
        let model_id = experiment.configured_model_ids[0];
        let feature_id = template.user_prompt.features[0].id;
        store
            .commit_experiment_results(
                experiment.id,
                &[
                    outcome(model_id, feature_id, &["Maps", "Waze"]),
                    outcome(model_id, feature_id, &["Waze"]),
                ],
                ExperimentStatus::Completed,
            )
            .unwrap();
        let waze = store
            .list_apps()
            .unwrap()
            .into_iter()
            .find(|a| a.name == "Waze")
            .unwrap();
        let ranks: Vec<i64> = store
            .list_rankings_for_app(waze.id)
            .unwrap()
            .iter()
            .map(|r| r.rank)
            .collect();
        assert_eq!(ranks, vec![2, 1]);
    }

    #[test]
    fn unknown_experiment_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.commit_experiment_results(7, &[], ExperimentStatus::Completed),
            Err(StoreError::NotFound { id: 7, .. })
        ));
        assert!(matches!(
            store.get_criterion(1),
            Err(StoreError::NotFound { .. })
        ));
    }
}
