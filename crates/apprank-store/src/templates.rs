use apprank_utils::types::ResponseFields;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use serde_json::Value;

use crate::error::StoreError;
use crate::models::{Feature, NewPromptTemplate, PromptTemplate, SystemPrompt, UserPrompt};
use crate::store::{Store, count_refs, or_not_found};

const ENTITY: &str = "PromptTemplate";

impl Store {
    /// Create a template, its system and user prompts, and the user prompt's
    /// features in one transaction. Fresh prompt rows are created for every
    /// template, so no prompt is ever shared.
    pub fn create_template(&self, new: &NewPromptTemplate) -> Result<PromptTemplate, StoreError> {
        self.with_tx(|tx| {
            let fields = new
                .system_prompt
                .response_fields
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;
            tx.execute(
                "INSERT INTO system_prompts (text, schema, response_fields) VALUES (?1, ?2, ?3)",
                params![new.system_prompt.text, new.system_prompt.schema, fields],
            )?;
            let system_prompt_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO user_prompts (text, k) VALUES (?1, ?2)",
                params![new.user_prompt.text, new.user_prompt.k],
            )?;
            let user_prompt_id = tx.last_insert_rowid();

            for feature in &new.user_prompt.features {
                tx.execute(
                    "INSERT INTO features (name, description, user_prompt_id) VALUES (?1, ?2, ?3)",
                    params![feature.name, feature.description, user_prompt_id],
                )?;
            }

            tx.execute(
                "INSERT INTO prompt_templates (name, system_prompt_id, user_prompt_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![new.name, system_prompt_id, user_prompt_id, Utc::now()],
            )?;
            get_template(tx, tx.last_insert_rowid())
        })
    }

    pub fn get_template(&self, id: i64) -> Result<PromptTemplate, StoreError> {
        self.with_conn(|conn| get_template(conn, id))
    }

    pub fn list_templates(&self) -> Result<Vec<PromptTemplate>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM prompt_templates ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| get_template(conn, id)).collect()
        })
    }

    pub fn get_feature(&self, id: i64) -> Result<Feature, StoreError> {
        self.with_conn(|conn| {
            or_not_found(
                conn.query_row(
                    "SELECT id, name, description, user_prompt_id FROM features WHERE id = ?1",
                    params![id],
                    row_to_feature,
                ),
                "Feature",
                id,
            )
        })
    }

    /// Delete a template together with its prompts and features.
    ///
    /// Protected while any experiment uses the template or any run points at
    /// one of its features.
    pub fn delete_template(&self, id: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let template = get_template(tx, id)?;
            let experiments = count_refs(tx, "experiments", "prompt_template_id", id)?;
            if experiments > 0 {
                return Err(StoreError::protected(ENTITY, id, experiments, "experiment"));
            }
            for feature in &template.user_prompt.features {
                let runs = count_refs(tx, "runs", "feature_id", feature.id)?;
                if runs > 0 {
                    return Err(StoreError::protected("Feature", feature.id, runs, "run"));
                }
            }

            tx.execute("DELETE FROM prompt_templates WHERE id = ?1", params![id])?;
            tx.execute(
                "DELETE FROM system_prompts WHERE id = ?1",
                params![template.system_prompt.id],
            )?;
            tx.execute(
                "DELETE FROM user_prompts WHERE id = ?1",
                params![template.user_prompt.id],
            )?;
            Ok(())
        })
    }
}

pub(crate) fn get_template(conn: &Connection, id: i64) -> Result<PromptTemplate, StoreError> {
    let (name, system_prompt_id, user_prompt_id, created_at) = or_not_found(
        conn.query_row(
            "SELECT name, system_prompt_id, user_prompt_id, created_at \
             FROM prompt_templates WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                ))
            },
        ),
        ENTITY,
        id,
    )?;

    let system_prompt = conn.query_row(
        "SELECT id, text, schema, response_fields FROM system_prompts WHERE id = ?1",
        params![system_prompt_id],
        row_to_system_prompt,
    )?;

    let (text, k) = conn.query_row(
        "SELECT text, k FROM user_prompts WHERE id = ?1",
        params![user_prompt_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
    )?;
    let mut stmt = conn.prepare(
        "SELECT id, name, description, user_prompt_id FROM features \
         WHERE user_prompt_id = ?1 ORDER BY id",
    )?;
    let features = stmt
        .query_map(params![user_prompt_id], row_to_feature)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PromptTemplate {
        id,
        name,
        system_prompt,
        user_prompt: UserPrompt {
            id: user_prompt_id,
            text,
            k,
            features,
        },
        created_at,
    })
}

fn row_to_system_prompt(row: &rusqlite::Row<'_>) -> rusqlite::Result<SystemPrompt> {
    let fields: Option<Value> = row.get(3)?;
    let response_fields = fields
        .map(serde_json::from_value::<ResponseFields>)
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(SystemPrompt {
        id: row.get(0)?,
        text: row.get(1)?,
        schema: row.get(2)?,
        response_fields,
    })
}

fn row_to_feature(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        user_prompt_id: row.get(3)?,
    })
}
