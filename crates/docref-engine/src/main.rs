//! docref - command-line access to a docref database.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docref_core::SchemaBundle;
use docref_engine::{Args, CascadeResult, Command, Database};
use docref_proto::DocumentId;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docref=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let (config, command) = args.into_config();

    tracing::debug!(
        data_path = %config.data_path.display(),
        max_cascade_depth = config.engine.max_cascade_depth,
        query_style = ?config.engine.query_style,
        "configuration loaded"
    );

    let mut database = Database::open(config)?;
    let outcome = run(&mut database, command).await;
    database.flush()?;

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "command failed");
    }
    outcome
}

async fn run(database: &mut Database, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Schema { file } => {
            let bundle = SchemaBundle::from_json(&std::fs::read_to_string(&file)?)?;
            let models = bundle.models.len();
            let references = database.register_schema(bundle)?;
            println!("registered {} models, {} references", models, references);
        }
        Command::Refs { target } => {
            for descriptor in database.registry().iter() {
                if target.as_deref().is_some_and(|t| t != descriptor.target_model) {
                    continue;
                }
                match database.policy_for(descriptor) {
                    Some(policy) => println!("{}  [{}]", descriptor, policy),
                    None => println!("{}  [unresolved]", descriptor),
                }
            }
        }
        Command::Policy {
            model,
            path,
            required,
            cascade,
        } => {
            database.set_reference_policy(&model, &path, required, cascade)?;
        }
        Command::Put { model, json, id } => {
            let data = serde_json::from_str(&json)?;
            let id = match id {
                Some(id) => {
                    let id = DocumentId::new(id);
                    database.insert_with_id(&model, id.clone(), data).await?;
                    id
                }
                None => database.insert(&model, data).await?,
            };
            println!("{}", id);
        }
        Command::Get { model, id } => match database.get(&model, &DocumentId::new(id)).await? {
            Some(record) => {
                let state = if record.deleted { "soft-deleted" } else { "live" };
                println!("{} ({})", serde_json::to_string_pretty(&record.data)?, state);
            }
            None => println!("not found"),
        },
        Command::Delete { model, id } => {
            print_result(&database.delete(&model, &DocumentId::new(id)).await?);
        }
        Command::SoftDelete { model, id } => {
            print_result(&database.soft_delete(&model, &DocumentId::new(id)).await?);
        }
        Command::Restore { model, id } => {
            print_result(&database.restore(&model, &DocumentId::new(id)).await?);
        }
    }
    Ok(())
}

fn print_result(result: &CascadeResult) {
    for (model, id) in &result.deleted {
        println!("deleted {}/{}", model, id);
    }
    for (model, id) in &result.soft_deleted {
        println!("soft-deleted {}/{}", model, id);
    }
    for (model, id) in &result.restored {
        println!("restored {}/{}", model, id);
    }
    for n in &result.nullified {
        println!("nullified {}.{} in {} documents", n.source_model, n.path, n.modified);
    }
    println!("{} documents affected", result.affected_count());
}
