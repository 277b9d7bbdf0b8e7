use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::StoreError;
use crate::models::{Llm, LlmUpdate, NewLlm};
use crate::store::{Store, count_refs, or_not_found};

const ENTITY: &str = "LLM";

impl Store {
    /// Insert an LLM. `api_key` must already be ciphertext.
    pub fn create_llm(&self, new: &NewLlm) -> Result<Llm, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO llms (name, provider, api_key, api_endpoint, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.name,
                    new.provider,
                    new.api_key,
                    new.api_endpoint,
                    Utc::now()
                ],
            )?;
            get_llm(conn, conn.last_insert_rowid())
        })
    }

    pub fn get_llm(&self, id: i64) -> Result<Llm, StoreError> {
        self.with_conn(|conn| get_llm(conn, id))
    }

    pub fn list_llms(&self) -> Result<Vec<Llm>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, provider, api_key, api_endpoint, created_at \
                 FROM llms ORDER BY id",
            )?;
            let llms = stmt
                .query_map([], row_to_llm)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(llms)
        })
    }

    pub fn update_llm(&self, id: i64, update: &LlmUpdate) -> Result<Llm, StoreError> {
        self.with_tx(|tx| {
            let mut llm = get_llm(tx, id)?;
            if let Some(name) = &update.name {
                llm.name.clone_from(name);
            }
            if let Some(provider) = &update.provider {
                llm.provider.clone_from(provider);
            }
            if let Some(api_key) = &update.api_key {
                llm.api_key.clone_from(api_key);
            }
            if let Some(endpoint) = &update.api_endpoint {
                llm.api_endpoint.clone_from(endpoint);
            }
            tx.execute(
                "UPDATE llms SET name = ?1, provider = ?2, api_key = ?3, api_endpoint = ?4 \
                 WHERE id = ?5",
                params![llm.name, llm.provider, llm.api_key, llm.api_endpoint, id],
            )?;
            Ok(llm)
        })
    }

    /// Delete an LLM that no configured model uses.
    pub fn delete_llm(&self, id: i64) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            get_llm(tx, id)?;
            let models = count_refs(tx, "configured_models", "llm_id", id)?;
            if models > 0 {
                return Err(StoreError::protected(ENTITY, id, models, "configured model"));
            }
            tx.execute("DELETE FROM llms WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

pub(crate) fn get_llm(conn: &Connection, id: i64) -> Result<Llm, StoreError> {
    or_not_found(
        conn.query_row(
            "SELECT id, name, provider, api_key, api_endpoint, created_at FROM llms WHERE id = ?1",
            params![id],
            row_to_llm,
        ),
        ENTITY,
        id,
    )
}

fn row_to_llm(row: &rusqlite::Row<'_>) -> rusqlite::Result<Llm> {
    Ok(Llm {
        id: row.get(0)?,
        name: row.get(1)?,
        provider: row.get(2)?,
        api_key: row.get(3)?,
        api_endpoint: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn llm_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let llm = fixtures::llm(&store);
        assert_eq!(llm.provider, "OpenAI");
        assert_eq!(llm.api_endpoint, None);

        let updated = store
            .update_llm(
                llm.id,
                &LlmUpdate {
                    name: Some("gpt-4o".to_string()),
                    api_endpoint: Some(Some("http://localhost:9000/v1".to_string())),
                    ..LlmUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "gpt-4o");
        assert_eq!(updated.api_key, llm.api_key);
        assert_eq!(store.get_llm(llm.id).unwrap(), updated);

        let cleared = store
            .update_llm(
                llm.id,
                &LlmUpdate {
                    api_endpoint: Some(None),
                    ..LlmUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.api_endpoint, None);

        store.delete_llm(llm.id).unwrap();
        assert!(matches!(
            store.get_llm(llm.id),
            Err(StoreError::NotFound { entity: "LLM", .. })
        ));
    }

    #[test]
    fn llm_in_use_is_protected() {
        let store = Store::open_in_memory().unwrap();
        let model = fixtures::configured_model(&store);

        let err = store.delete_llm(model.llm_id).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Cannot delete LLM {}: referenced by 1 configured model",
                model.llm_id
            )
        );
        assert!(store.get_llm(model.llm_id).is_ok());
    }

    #[test]
    fn listing_is_ordered_by_id() {
        let store = Store::open_in_memory().unwrap();
        let first = fixtures::llm(&store);
        let second = fixtures::llm(&store);
        let ids: Vec<i64> = store.list_llms().unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
