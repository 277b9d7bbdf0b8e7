use rusqlite::Connection;

use crate::error::StoreError;

pub(crate) fn configure(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;\
         PRAGMA synchronous=NORMAL;\
         PRAGMA foreign_keys=ON;\
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Create every table. Non-cascading references are RESTRICT so that a
/// referenced row can only go once its dependents are gone.
pub(crate) fn create_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS llms (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL,\
           provider TEXT NOT NULL,\
           api_key TEXT NOT NULL,\
           api_endpoint TEXT,\
           created_at TEXT NOT NULL\
         );\
         CREATE TABLE IF NOT EXISTS configurations (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL,\
           temperature REAL NOT NULL,\
           top_p REAL NOT NULL DEFAULT 1.0\
         );\
         CREATE TABLE IF NOT EXISTS configured_models (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           llm_id INTEGER NOT NULL REFERENCES llms(id) ON DELETE RESTRICT,\
           configuration_id INTEGER NOT NULL REFERENCES configurations(id) ON DELETE RESTRICT,\
           short_name TEXT NOT NULL,\
           UNIQUE(llm_id, configuration_id)\
         );\
         CREATE TABLE IF NOT EXISTS system_prompts (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           text TEXT NOT NULL,\
           schema TEXT NOT NULL,\
           response_fields TEXT\
         );\
         CREATE TABLE IF NOT EXISTS user_prompts (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           text TEXT NOT NULL,\
           k INTEGER\
         );\
         CREATE TABLE IF NOT EXISTS features (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL,\
           description TEXT,\
           user_prompt_id INTEGER NOT NULL REFERENCES user_prompts(id) ON DELETE CASCADE\
         );\
         CREATE TABLE IF NOT EXISTS prompt_templates (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL,\
           system_prompt_id INTEGER NOT NULL UNIQUE REFERENCES system_prompts(id) ON DELETE RESTRICT,\
           user_prompt_id INTEGER NOT NULL UNIQUE REFERENCES user_prompts(id) ON DELETE RESTRICT,\
           created_at TEXT NOT NULL\
         );\
         CREATE TABLE IF NOT EXISTS experiments (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL UNIQUE,\
           prompt_template_id INTEGER NOT NULL REFERENCES prompt_templates(id) ON DELETE RESTRICT,\
           num_runs INTEGER NOT NULL CHECK (num_runs >= 1),\
           status TEXT NOT NULL DEFAULT 'running',\
           created_at TEXT NOT NULL\
         );\
         CREATE TABLE IF NOT EXISTS experiment_configured_models (\
           experiment_id INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,\
           configured_model_id INTEGER NOT NULL REFERENCES configured_models(id) ON DELETE RESTRICT,\
           position INTEGER NOT NULL,\
           PRIMARY KEY (experiment_id, configured_model_id)\
         );\
         CREATE TABLE IF NOT EXISTS runs (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           experiment_id INTEGER NOT NULL REFERENCES experiments(id) ON DELETE CASCADE,\
           configured_model_id INTEGER NOT NULL REFERENCES configured_models(id) ON DELETE RESTRICT,\
           feature_id INTEGER NOT NULL REFERENCES features(id) ON DELETE RESTRICT,\
           elapsed_time REAL NOT NULL,\
           created_at TEXT NOT NULL\
         );\
         CREATE TABLE IF NOT EXISTS mobile_apps (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL UNIQUE\
         );\
         CREATE TABLE IF NOT EXISTS mobile_app_rankings (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           mobile_app_id INTEGER NOT NULL REFERENCES mobile_apps(id) ON DELETE RESTRICT,\
           run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,\
           rank INTEGER NOT NULL,\
           UNIQUE(mobile_app_id, run_id)\
         );\
         CREATE TABLE IF NOT EXISTS ranking_criteria (\
           id INTEGER PRIMARY KEY AUTOINCREMENT,\
           name TEXT NOT NULL,\
           description TEXT NOT NULL DEFAULT '',\
           run_id INTEGER REFERENCES runs(id) ON DELETE CASCADE\
         );\
         CREATE INDEX IF NOT EXISTS idx_features_user_prompt ON features(user_prompt_id);\
         CREATE INDEX IF NOT EXISTS idx_runs_experiment ON runs(experiment_id);\
         CREATE INDEX IF NOT EXISTS idx_rankings_run_rank ON mobile_app_rankings(run_id, rank);\
         CREATE INDEX IF NOT EXISTS idx_criteria_run ON ranking_criteria(run_id);",
    )?;
    Ok(())
}
