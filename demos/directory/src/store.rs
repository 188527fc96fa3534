//! In-memory providers backing the demo.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::debug;
use trellis::core::{BoxedQueryHandler, PatchOperationKind};
use trellis::prelude::*;

#[derive(Debug, Clone)]
struct Entry {
    revision: u64,
    content: Value,
}

impl Entry {
    fn to_resource(&self, id: &str) -> Resource {
        Resource::new(
            Some(id.to_string()),
            Some(self.revision.to_string()),
            self.content.clone(),
        )
    }
}

fn check_revision(entry: &Entry, expected: Option<&str>) -> ResourceResult<()> {
    match expected {
        Some(rev) if rev != entry.revision.to_string() => Err(ResourceError::conflict(format!(
            "expected revision {rev}, found {}",
            entry.revision
        ))),
        _ => Ok(()),
    }
}

fn apply_patch(content: &mut Value, operations: &[PatchOperation]) -> ResourceResult<()> {
    let Value::Object(fields) = content else {
        return Err(ResourceError::bad_request("only objects can be patched"));
    };

    for op in operations {
        let field = op.field.trim_start_matches('/').to_string();
        match (op.operation, &op.value) {
            (PatchOperationKind::Add | PatchOperationKind::Replace, Some(value)) => {
                fields.insert(field, value.clone());
            }
            (PatchOperationKind::Remove, _) => {
                fields.remove(&field);
            }
            (PatchOperationKind::Increment, Some(Value::Number(amount))) => {
                let current = fields.get(&field).and_then(Value::as_i64).unwrap_or(0);
                let amount = amount
                    .as_i64()
                    .ok_or_else(|| ResourceError::bad_request("increment must be an integer"))?;
                fields.insert(field, json!(current + amount));
            }
            (kind, _) => {
                return Err(ResourceError::bad_request(format!(
                    "invalid value for {kind:?} on '{field}'"
                )));
            }
        }
    }
    Ok(())
}

/// A collection of users keyed by id.
#[derive(Default)]
pub struct UserStore {
    users: Mutex<BTreeMap<String, Entry>>,
    next_id: Mutex<u64>,
}

impl UserStore {
    fn with_entry<F>(&self, id: &str, f: F) -> Promise<Resource>
    where
        F: FnOnce(&mut BTreeMap<String, Entry>) -> ResourceResult<Resource>,
    {
        let mut users = self.users.lock();
        if !users.contains_key(id) {
            return Promise::failed(ResourceError::not_found(format!("no user '{id}'")));
        }
        Promise::completed(f(&mut users))
    }
}

impl CollectionResourceProvider for UserStore {
    fn action_collection(&self, _: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        match request.action.as_str() {
            "count" => Promise::succeeded(json!({ "count": self.users.lock().len() })),
            other => Promise::failed(ResourceError::bad_request(format!(
                "unknown action '{other}'"
            ))),
        }
    }

    fn action_instance(&self, _: Context, id: &str, request: Arc<ActionRequest>) -> Promise<Value> {
        Promise::failed(ResourceError::not_supported(format!(
            "action '{}' on user '{id}'",
            request.action
        )))
    }

    fn create_instance(&self, _: Context, request: Arc<CreateRequest>) -> Promise<Resource> {
        let id = match &request.new_resource_id {
            Some(id) => id.clone(),
            None => {
                let mut next = self.next_id.lock();
                *next += 1;
                format!("u{next}")
            }
        };

        let mut users = self.users.lock();
        if users.contains_key(&id) {
            return Promise::failed(ResourceError::conflict(format!("user '{id}' exists")));
        }
        let entry = Entry {
            revision: 1,
            content: request.content.clone(),
        };
        let resource = entry.to_resource(&id);
        users.insert(id, entry);
        Promise::succeeded(resource)
    }

    fn delete_instance(
        &self,
        _: Context,
        id: &str,
        request: Arc<DeleteRequest>,
    ) -> Promise<Resource> {
        self.with_entry(id, |users| {
            let entry = &users[id];
            check_revision(entry, request.revision.as_deref())?;
            let resource = entry.to_resource(id);
            users.remove(id);
            Ok(resource)
        })
    }

    fn patch_instance(
        &self,
        _: Context,
        id: &str,
        request: Arc<PatchRequest>,
    ) -> Promise<Resource> {
        self.with_entry(id, |users| {
            let entry = users
                .get_mut(id)
                .ok_or_else(|| ResourceError::not_found(format!("no user '{id}'")))?;
            check_revision(entry, request.revision.as_deref())?;
            apply_patch(&mut entry.content, &request.operations)?;
            entry.revision += 1;
            Ok(entry.to_resource(id))
        })
    }

    fn query_collection(
        &self,
        _: Context,
        request: Arc<QueryRequest>,
        handler: BoxedQueryHandler,
    ) -> Promise<QueryResult> {
        let matches: Vec<_> = self
            .users
            .lock()
            .iter()
            .filter(|(_, entry)| match &request.query_filter {
                Some(filter) => entry.content.to_string().contains(filter.as_str()),
                None => true,
            })
            .map(|(id, entry)| entry.to_resource(id))
            .collect();

        debug!(matches = matches.len(), "Streaming users");
        for resource in matches {
            if !handler.handle_resource(resource) {
                break;
            }
        }
        Promise::succeeded(QueryResult::complete())
    }

    fn read_instance(&self, _: Context, id: &str, _: Arc<ReadRequest>) -> Promise<Resource> {
        self.with_entry(id, |users| Ok(users[id].to_resource(id)))
    }

    fn update_instance(
        &self,
        _: Context,
        id: &str,
        request: Arc<UpdateRequest>,
    ) -> Promise<Resource> {
        self.with_entry(id, |users| {
            let entry = users
                .get_mut(id)
                .ok_or_else(|| ResourceError::not_found(format!("no user '{id}'")))?;
            check_revision(entry, request.revision.as_deref())?;
            entry.content = request.content.clone();
            entry.revision += 1;
            Ok(entry.to_resource(id))
        })
    }
}

/// Directory-wide settings.
pub struct Settings {
    entry: Mutex<Entry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            entry: Mutex::new(Entry {
                revision: 1,
                content: json!({ "registration_open": true, "max_users": 100 }),
            }),
        }
    }
}

impl SingletonResourceProvider for Settings {
    fn action_instance(&self, _: Context, request: Arc<ActionRequest>) -> Promise<Value> {
        Promise::failed(ResourceError::not_supported(format!(
            "action '{}' on settings",
            request.action
        )))
    }

    fn patch_instance(&self, _: Context, request: Arc<PatchRequest>) -> Promise<Resource> {
        let mut entry = self.entry.lock();
        let result = check_revision(&entry, request.revision.as_deref())
            .and_then(|()| apply_patch(&mut entry.content, &request.operations))
            .map(|()| {
                entry.revision += 1;
                entry.to_resource("settings")
            });
        Promise::completed(result)
    }

    fn read_instance(&self, _: Context, _: Arc<ReadRequest>) -> Promise<Resource> {
        Promise::succeeded(self.entry.lock().to_resource("settings"))
    }

    fn update_instance(&self, _: Context, request: Arc<UpdateRequest>) -> Promise<Resource> {
        let mut entry = self.entry.lock();
        let result = check_revision(&entry, request.revision.as_deref()).map(|()| {
            entry.content = request.content.clone();
            entry.revision += 1;
            entry.to_resource("settings")
        });
        Promise::completed(result)
    }
}
