//! Directory Demo
//!
//! Serves an in-memory user directory through a Trellis router and drives it
//! over an internal connection:
//!
//! ```text
//! users          (collection)  create, query, action
//! users/{id}     (instance)    read, update, patch, delete
//! settings       (singleton)   read, update, patch
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package directory-demo
//! cargo run --package directory-demo -- --config trellis.toml --profile dev
//! ```

mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};
use trellis::core::BoxedQueryHandler;
use trellis::prelude::*;
use trellis::runtime::{RouteConfig, TrellisConfig};

use store::{Settings, UserStore};

#[derive(Debug, Parser)]
#[command(version, about = "An in-memory user directory served through Trellis")]
struct Args {
    /// Configuration file; the built-in routes are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `dev` loads `trellis.dev.toml`.
    #[arg(short, long)]
    profile: Option<String>,
}

fn builtin_config() -> TrellisConfig {
    TrellisConfig {
        routes: vec![
            RouteConfig::new("users", RoutingMode::StartsWith, "users"),
            RouteConfig::new("settings", RoutingMode::Equals, "settings"),
        ],
        ..Default::default()
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut bootstrap = Bootstrap::new()
        .collection("users", Arc::new(UserStore::default()))
        .singleton("settings", Arc::new(Settings::default()));
    bootstrap = match (&args.config, &args.profile) {
        (Some(path), profile) => {
            let bootstrap = bootstrap.config_file(path);
            match profile {
                Some(profile) => bootstrap.profile(profile),
                None => bootstrap,
            }
        }
        (None, _) => bootstrap.config(builtin_config()),
    };
    let runtime = bootstrap.build()?;
    let connection = runtime.connection()?;

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    let alice = connection
        .create(
            Context::root(),
            CreateRequest::new("users/alice", json!({ "name": "Alice", "logins": 0 })),
        )
        .await?;
    info!(id = ?alice.id, rev = ?alice.revision, "Created user");

    let generated = connection
        .create(
            Context::root(),
            CreateRequest::new("users", json!({ "name": "Bob", "logins": 0 })),
        )
        .await?;
    info!(id = ?generated.id, "Created user with generated id");

    // ------------------------------------------------------------------------
    // Read, patch and a stale update
    // ------------------------------------------------------------------------

    let patched = connection
        .patch(
            Context::root(),
            PatchRequest::new(
                "users/alice",
                vec![PatchOperation::increment("/logins", json!(1))],
            )
            .with_revision("1"),
        )
        .await?;
    info!(content = %patched.content, rev = ?patched.revision, "Patched user");

    match connection
        .update(
            Context::root(),
            UpdateRequest::new("users/alice", json!({ "name": "Mallory" })).with_revision("1"),
        )
        .await
    {
        Ok(_) => warn!("Stale update unexpectedly succeeded"),
        Err(e) => info!(code = e.code(), error = %e, "Stale update rejected"),
    }

    let read = connection
        .read(Context::root(), ReadRequest::new("users/alice"))
        .await?;
    info!(content = %read.content, "Read user");

    // ------------------------------------------------------------------------
    // Query
    // ------------------------------------------------------------------------

    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&names);
    let handler: BoxedQueryHandler = Arc::new(move |user: Resource| {
        sink.lock().push(user.content["name"].to_string());
        true
    });
    let result = connection
        .query(Context::root(), QueryRequest::new("users"), handler)
        .await?;
    info!(
        users = ?names.lock(),
        complete = result.is_complete(),
        "Queried users"
    );

    let count = connection
        .action(Context::root(), ActionRequest::new("users", "count"))
        .await?;
    info!(%count, "Counted users");

    // ------------------------------------------------------------------------
    // Singleton and errors
    // ------------------------------------------------------------------------

    let settings = connection
        .patch(
            Context::root(),
            PatchRequest::new(
                "settings",
                vec![PatchOperation::replace("/registration_open", json!(false))],
            ),
        )
        .await?;
    info!(content = %settings.content, "Patched settings");

    for path in ["users/alice/devices", "nowhere"] {
        if let Err(e) = connection
            .read(Context::root(), ReadRequest::new(path))
            .await
        {
            info!(path, code = e.code(), error = %e, "Read failed as expected");
        }
    }

    let deleted = connection
        .delete(Context::root(), DeleteRequest::new("users/alice"))
        .await?;
    info!(id = ?deleted.id, "Deleted user");

    connection.close();
    Ok(())
}
