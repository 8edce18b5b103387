//! Drive a two-step counter workflow against a checkpoint file
//!
//! Each invocation resumes from the latest checkpoint of the thread, runs
//! `increment` then `update`, and checkpoints after every step. Pending
//! writes are recorded against the checkpoint they were computed from.
//!
//! ```text
//! RUST_LOG=json_checkpoint=debug cargo run --example json_file_saver
//! ```

use anyhow::Result;
use futures::TryStreamExt;
use json_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, CheckpointSource,
    JsonFileCheckpointSaver, StoreConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

type State = HashMap<String, Value>;
type Node = fn(&State) -> Vec<(String, Value)>;

fn increment(state: &State) -> Vec<(String, Value)> {
    let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
    vec![("count".to_string(), json!(count + 1))]
}

fn update(state: &State) -> Vec<(String, Value)> {
    let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
    vec![("message".to_string(), json!(format!("count is {}", count)))]
}

async fn invoke(saver: &JsonFileCheckpointSaver, thread: &CheckpointConfig, input: State) -> Result<State> {
    let (mut state, mut step, mut head) = match saver.get_tuple(thread).await? {
        Some(tuple) => (
            tuple.checkpoint.channel_values,
            tuple.metadata.step.unwrap_or(0) + 1,
            tuple.config,
        ),
        None => (State::new(), 0, thread.clone()),
    };
    state.extend(input.clone());

    let metadata = CheckpointMetadata::new()
        .with_source(CheckpointSource::Input)
        .with_step(step)
        .with_extra("writes".to_string(), json!(input));
    head = saver.put(&head, Checkpoint::new(state.clone()), metadata).await?;

    let nodes: [(&str, Node); 2] = [("increment", increment), ("update", update)];
    for (name, node) in nodes {
        step += 1;
        let writes = node(&state);
        saver.put_writes(&head, writes.clone(), name.to_string()).await?;
        state.extend(writes);

        let metadata = CheckpointMetadata::new()
            .with_source(CheckpointSource::Loop)
            .with_step(step)
            .with_extra("node".to_string(), json!(name));
        head = saver.put(&head, Checkpoint::new(state.clone()), metadata).await?;
    }

    Ok(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let saver = JsonFileCheckpointSaver::from_config(StoreConfig::new("tmp/checkpoint.json").with_pretty(true)).await?;
    let thread = CheckpointConfig::new().with_thread_id("example-thread".to_string());

    let initial = State::from([
        ("count".to_string(), json!(0)),
        ("message".to_string(), json!("initial")),
    ]);
    let first_state = invoke(&saver, &thread, initial).await?;
    println!("*** first_state ***\n{:?}", first_state);

    let second_state = invoke(&saver, &thread, first_state).await?;
    println!("*** second_state ***\n{:?}", second_state);

    if let Some(latest) = saver.get_tuple(&thread).await? {
        println!("Checkpoint: {:?}", latest.checkpoint);
        println!("Metadata: {:?}", latest.metadata);
    }

    let history: Vec<_> = saver.list(Some(&thread), None, None, None).await?.try_collect().await?;
    for tuple in history {
        println!(
            "Listed Checkpoint: {} (step {:?}, {} pending writes)",
            tuple.checkpoint.id,
            tuple.metadata.step,
            tuple.pending_writes.len()
        );
    }

    Ok(())
}
